//! Paint ordering and hit-testing of scene objects without a depth buffer.

use crate::config::ElementId;
use crate::math::{Bounds, Vector2};
use std::cmp::Ordering;

/// One object's ordering and hit-test data for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layered {
    pub id: ElementId,
    pub z_index: i64,
    /// Camera-space z; larger is nearer.
    pub depth: f64,
    pub bounds: Option<Bounds>,
    /// Behind the globe and inside its silhouette.
    pub occluded: bool,
}

#[derive(Debug, Default)]
pub struct Compositor {
    order: Vec<Layered>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the paint order: explicit z-index first, then far to near.
    /// Ties keep their input order.
    pub fn arrange(&mut self, items: impl IntoIterator<Item = Layered>) {
        self.order.clear();
        self.order.extend(items);
        self.order.sort_by(|a, b| {
            a.z_index
                .cmp(&b.z_index)
                .then_with(|| a.depth.partial_cmp(&b.depth).unwrap_or(Ordering::Equal))
        });
    }

    /// Back to front.
    pub fn order(&self) -> &[Layered] {
        &self.order
    }

    /// The topmost object whose bounds contain `point`. Objects the globe
    /// hides are never hit.
    pub fn hit_test(&self, point: Vector2) -> Option<ElementId> {
        self.order
            .iter()
            .rev()
            .filter(|l| !l.occluded)
            .find(|l| l.bounds.is_some_and(|b| b.within(point)))
            .map(|l| l.id)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}
