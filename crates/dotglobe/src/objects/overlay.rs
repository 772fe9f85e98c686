use super::{
    anchor, anchor_property, anchored_properties, depth_factor, placed_location, z_index,
    FrameContext, SceneObject,
};
use crate::config::{Element, ElementId, ElementKind, Invalidate, Kind, Property, PropertyBag, Value};
use crate::math::{Bounds, Vector2};
use crate::view::{Layered, Projected, Surface2d};

fn properties() -> Vec<Property> {
    let mut props = anchored_properties();
    props.extend([
        anchor_property(0.5, 0.5),
        // Host-reported size, used for hit-testing.
        Property::attr("width", Kind::float(0.0, 4096.0), Value::Float(0.0)),
        Property::attr("height", Kind::float(0.0, 4096.0), Value::Float(0.0)),
    ]);
    props
}

/// How the host should show an overlay this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub id: ElementId,
    /// Anchor position in CSS pixels.
    pub screen: Vector2,
    pub opacity: f64,
    pub scale: f64,
    /// False while the globe hides the overlay.
    pub pointer_events: bool,
    pub visible: bool,
}

/// An element the host positions itself, tracked to a location.
pub struct Overlay {
    id: ElementId,
    bag: PropertyBag,
    text: String,
    projected: Option<Projected>,
    placement: Option<Placement>,
}

impl Overlay {
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            bag: PropertyBag::new(properties()),
            text: String::new(),
            projected: None,
            placement: None,
        }
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// Text content of the element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Fractions of the overlay's size that sit on its location.
    pub fn anchor(&self) -> (f64, f64) {
        anchor(&self.bag)
    }

    /// Size last reported by the host, unscaled.
    pub fn size(&self) -> Vector2 {
        Vector2::new(self.bag.f64("width"), self.bag.f64("height"))
    }

    fn bounds(&self) -> Option<Bounds> {
        let p = self.placement.filter(|p| p.visible)?;
        let (w, h) = (self.bag.f64("width") * p.scale, self.bag.f64("height") * p.scale);
        let (ax, ay) = anchor(&self.bag);
        let b = Bounds::new(p.screen.x - ax * w, p.screen.y - ay * h, w, h);
        (!b.is_empty()).then_some(b)
    }
}

impl SceneObject for Overlay {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Overlay
    }

    fn properties(&self) -> &PropertyBag {
        &self.bag
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    fn update(&mut self, element: &Element, dt: f64, ctx: &FrameContext) -> Invalidate {
        let dirty = self.bag.update(element, dt);
        if self.text != element.text {
            self.text.clone_from(&element.text);
        }

        let p = ctx.view.project(&placed_location(&self.bag), 1.0);
        let (front, back) = ctx.alphas(p.facing());
        let opacity = (front + back).clamp(0.0, 1.0);
        self.placement = Some(Placement {
            id: self.id,
            screen: p.screen,
            opacity,
            scale: depth_factor(p.facing(), self.bag.f64("depth-scale")),
            pointer_events: !p.is_occluded(),
            visible: !self.bag.bool("hidden") && opacity > 0.0,
        });
        self.projected = Some(p);
        dirty
    }

    fn layer(&self) -> Layered {
        Layered {
            id: self.id,
            z_index: z_index(&self.bag),
            depth: self.projected.map_or(0.0, |p| p.camera.z),
            bounds: self.bounds(),
            occluded: self.projected.map_or(true, |p| p.is_occluded()),
        }
    }

    /// Overlays are drawn by the host.
    fn draw(&mut self, _ctx: &FrameContext, _front: &mut dyn Surface2d, _back: &mut dyn Surface2d) {}

    fn as_overlay(&self) -> Option<&Overlay> {
        Some(self)
    }
}
