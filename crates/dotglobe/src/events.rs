use crate::config::ElementId;
use crate::math::Location;

/// Lifecycle and interaction notifications, drained by the host each frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobeEvent {
    /// First update ran; options are parsed.
    Init,
    /// Resources settled and the first frame with points was drawn.
    Complete,
    /// The camera center moved.
    Change { center: Location },
    /// Pointer released without dragging.
    Tap {
        element: Option<ElementId>,
        location: Option<Location>,
    },
}
