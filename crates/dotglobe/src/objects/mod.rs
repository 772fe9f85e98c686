//! Scene objects: markers, text labels, arcs/spikes and host overlays.
//!
//! Each child element of the document gets one object, created the first
//! time it is seen and dropped once the element is detached.

pub mod line;
pub mod marker;
pub mod overlay;
pub mod text;

pub use line::Line;
pub use marker::Marker;
pub use overlay::{Overlay, Placement};
pub use text::Text;

use crate::config::{
    Document, Element, ElementId, ElementKind, GlobeSettings, Invalidate, Kind, Property,
    PropertyBag, Value,
};
use crate::math::Location;
use crate::resources::Resources;
use crate::view::{Layered, Surface2d, View};
use std::collections::BTreeMap;

/// Alphas below this are not drawn.
const MIN_ALPHA: f64 = 1.0 / 255.0;

/// What objects read while updating and drawing.
pub struct FrameContext<'a> {
    pub view: &'a View,
    pub settings: &'a GlobeSettings,
    pub resources: &'a Resources,
    pub hovered: Option<ElementId>,
}

impl FrameContext<'_> {
    /// Front and back surface alphas for content facing `facing`.
    pub fn alphas(&self, facing: f64) -> (f64, f64) {
        View::hemisphere_alphas(
            facing,
            self.settings.backside_transition,
            self.settings.backside_opacity,
        )
    }

    /// Runs `draw` once per surface the content is visible on, back first,
    /// with that surface's alpha applied.
    pub fn paint_split(
        &self,
        facing: f64,
        front: &mut dyn Surface2d,
        back: &mut dyn Surface2d,
        mut draw: impl FnMut(&mut dyn Surface2d),
    ) {
        let (f, b) = self.alphas(facing);
        paint_with(back, b, &mut draw);
        paint_with(front, f, &mut draw);
    }
}

fn paint_with(surface: &mut dyn Surface2d, alpha: f64, draw: &mut impl FnMut(&mut dyn Surface2d)) {
    if alpha >= MIN_ALPHA {
        surface.set_alpha(alpha);
        draw(&mut *surface);
        surface.set_alpha(1.0);
    }
}

pub trait SceneObject {
    fn id(&self) -> ElementId;

    fn kind(&self) -> ElementKind;

    fn properties(&self) -> &PropertyBag;

    fn properties_mut(&mut self) -> &mut PropertyBag;

    /// Re-reads the element, advances animations and reprojects.
    fn update(&mut self, element: &Element, dt: f64, ctx: &FrameContext) -> Invalidate;

    /// Ordering and hit-test data from the last update.
    fn layer(&self) -> Layered;

    fn draw(&mut self, ctx: &FrameContext, front: &mut dyn Surface2d, back: &mut dyn Surface2d);

    /// Image urls this object wants loaded.
    fn urls(&self) -> Vec<String> {
        Vec::new()
    }

    fn as_overlay(&self) -> Option<&Overlay> {
        None
    }
}

pub fn create(id: ElementId, kind: ElementKind) -> Box<dyn SceneObject> {
    match kind {
        ElementKind::Marker => Box::new(Marker::new(id)),
        ElementKind::Text => Box::new(Text::new(id)),
        ElementKind::Line => Box::new(Line::new(id)),
        ElementKind::Overlay => Box::new(Overlay::new(id)),
    }
}

#[derive(Default)]
pub struct ObjectStore {
    objects: BTreeMap<ElementId, Box<dyn SceneObject>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates objects for new children, drops detached ones and updates
    /// the rest.
    pub fn sync(&mut self, document: &Document, dt: f64, ctx: &FrameContext) -> Invalidate {
        self.objects.retain(|id, _| document.contains(*id));

        let mut dirty = Invalidate::NONE;
        for child in document.children() {
            let obj = self.objects.entry(child.id).or_insert_with(|| {
                log::debug!("new {:?} object {:?}", child.kind, child.id);
                create(child.id, child.kind)
            });
            dirty |= obj.update(&child.element, dt, ctx);
        }
        dirty
    }

    pub fn get(&self, id: ElementId) -> Option<&dyn SceneObject> {
        self.objects.get(&id).map(|o| o.as_ref())
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut (dyn SceneObject + 'static)> {
        self.objects.get_mut(&id).map(|o| o.as_mut())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn layers(&self) -> impl Iterator<Item = Layered> + '_ {
        self.objects.values().map(|o| o.layer())
    }

    pub fn urls(&self) -> Vec<String> {
        self.objects.values().flat_map(|o| o.urls()).collect()
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> + '_ {
        self.objects.values().filter_map(|o| o.as_overlay())
    }

    /// Draws in the given paint order.
    pub fn draw(
        &mut self,
        order: &[Layered],
        ctx: &FrameContext,
        front: &mut dyn Surface2d,
        back: &mut dyn Surface2d,
    ) {
        for layer in order {
            if let Some(obj) = self.objects.get_mut(&layer.id) {
                obj.draw(ctx, front, back);
            }
        }
    }

    /// Settles every object animation at its start values.
    pub fn cancel_animations(&mut self) {
        for obj in self.objects.values_mut() {
            obj.properties_mut().cancel_animations();
        }
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

/// Properties every object understands.
pub(crate) fn common_properties() -> Vec<Property> {
    vec![
        Property::attr("z-index", Kind::int(-10_000, 10_000), Value::Int(0)),
        Property::attr("hidden", Kind::Bool, Value::Bool(false)),
    ]
}

/// Properties of objects pinned to one location.
pub(crate) fn anchored_properties() -> Vec<Property> {
    let mut props = common_properties();
    props.extend([
        Property::attr("location", Kind::Location, Value::Location(Location::default()))
            .invalidates(Invalidate::LAYOUT),
        Property::attr("offset", Kind::float(0.0, 10.0), Value::Float(0.0))
            .invalidates(Invalidate::LAYOUT),
        Property::attr("depth-scale", Kind::float(0.0, 1.0), Value::Float(0.5)),
    ]);
    props
}

pub(crate) fn anchor_property(x: f64, y: f64) -> Property {
    Property::attr(
        "anchor",
        Kind::Array(Box::new(Kind::float(0.0, 1.0))),
        Value::Array(vec![Value::Float(x), Value::Float(y)]),
    )
}

pub(crate) fn z_index(bag: &PropertyBag) -> i64 {
    bag.get("z-index").and_then(Value::as_i64).unwrap_or(0)
}

/// `location` lifted by `offset`.
pub(crate) fn placed_location(bag: &PropertyBag) -> Location {
    let loc = bag.location("location").unwrap_or_default();
    loc.with_offset(loc.offset + bag.f64("offset"))
}

/// Two-axis anchor in [0, 1]; missing components are 0.5.
pub(crate) fn anchor(bag: &PropertyBag) -> (f64, f64) {
    let values = bag.get("anchor").map(Value::as_array).unwrap_or(&[]);
    let at = |i: usize| values.get(i).and_then(Value::as_f64).unwrap_or(0.5);
    (at(0), at(1))
}

/// Size multiplier for content facing `facing`: 1 at the nearest point,
/// `1 - depth_scale` at the farthest.
pub(crate) fn depth_factor(facing: f64, depth_scale: f64) -> f64 {
    1.0 - depth_scale * (1.0 - facing.clamp(-1.0, 1.0)) / 2.0
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::options::Quality;

    pub struct Fixture {
        pub view: View,
        pub settings: GlobeSettings,
        pub resources: Resources,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                view: View::new(800.0, 600.0, 1.0, Quality::Medium),
                settings: GlobeSettings::default(),
                resources: Resources::new(None),
            }
        }

        pub fn ctx(&self) -> FrameContext<'_> {
            FrameContext {
                view: &self.view,
                settings: &self.settings,
                resources: &self.resources,
                hovered: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;
    use crate::view::DrawList;

    #[test]
    fn depth_factor_spans_scale() {
        assert_eq!(depth_factor(1.0, 0.5), 1.0);
        assert_eq!(depth_factor(-1.0, 0.5), 0.5);
        assert_eq!(depth_factor(-1.0, 0.0), 1.0);
    }

    #[test]
    fn store_follows_document() {
        let fx = Fixture::new();
        let mut doc = Document::default();
        let a = doc.append(ElementKind::Marker, Element::new());
        let b = doc.append(ElementKind::Text, Element::new().with_text("hi"));

        let mut store = ObjectStore::new();
        store.sync(&doc, 0.0, &fx.ctx());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(b).map(|o| o.kind()), Some(ElementKind::Text));

        doc.remove(a);
        store.sync(&doc, 0.0, &fx.ctx());
        assert_eq!(store.len(), 1);
        assert!(store.get(a).is_none());
    }

    #[test]
    fn split_paint_targets_the_right_surface() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let (mut front, mut back) = (DrawList::new(), DrawList::new());
        let dot = |s: &mut dyn Surface2d| s.circle(crate::math::Vector2::ZERO, 1.0, crate::math::Color::WHITE);

        ctx.paint_split(1.0, &mut front, &mut back, dot);
        assert_eq!((front.len(), back.len()), (1, 0));

        ctx.paint_split(-1.0, &mut front, &mut back, dot);
        assert_eq!((front.len(), back.len()), (1, 1));

        // Inside the transition band both surfaces receive it.
        ctx.paint_split(0.0, &mut front, &mut back, dot);
        assert_eq!((front.len(), back.len()), (2, 2));
    }
}
