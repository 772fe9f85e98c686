use super::{
    anchor, anchor_property, anchored_properties, depth_factor, placed_location, z_index,
    FrameContext, SceneObject,
};
use crate::config::{Element, ElementId, ElementKind, Invalidate, Kind, Property, PropertyBag, Value};
use crate::math::{Bounds, Color, Vector2};
use crate::view::{Font, Layered, Projected, Surface2d, TextAlign};

/// Gap between a marker and its title, in CSS pixels.
const TITLE_GAP: f64 = 4.0;

fn properties() -> Vec<Property> {
    let mut props = anchored_properties();
    props.extend([
        Property::attr("icon", Kind::Url, Value::None),
        Property::attr("title", Kind::String, Value::String(String::new())),
        Property::attr("title-persistent", Kind::Bool, Value::Bool(false)),
        Property::attr("rotation", Kind::float(-360.0, 360.0), Value::Float(0.0)),
        anchor_property(0.5, 0.5),
        Property::style("--marker-size", Kind::float(0.0, 512.0), Value::Float(16.0)),
        Property::style("--marker-color", Kind::Color, Value::Color(Color::WHITE)),
        Property::style("--title-size", Kind::float(1.0, 128.0), Value::Float(12.0)),
        Property::style("--title-color", Kind::Color, Value::Color(Color::WHITE)),
    ]);
    props
}

/// An icon (or a dot when it has none) pinned to a location.
pub struct Marker {
    id: ElementId,
    bag: PropertyBag,
    projected: Option<Projected>,
    rect: Bounds,
}

impl Marker {
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            bag: PropertyBag::new(properties()),
            projected: None,
            rect: Bounds::default(),
        }
    }

    pub fn projected(&self) -> Option<&Projected> {
        self.projected.as_ref()
    }

    /// Icon rectangle from the last update.
    pub fn rect(&self) -> Bounds {
        self.rect
    }

    fn title_visible(&self, ctx: &FrameContext) -> bool {
        !self.bag.str("title").is_empty()
            && (self.bag.bool("title-persistent") || ctx.hovered == Some(self.id))
    }
}

impl SceneObject for Marker {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Marker
    }

    fn properties(&self) -> &PropertyBag {
        &self.bag
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    fn update(&mut self, element: &Element, dt: f64, ctx: &FrameContext) -> Invalidate {
        let dirty = self.bag.update(element, dt);

        let p = ctx.view.project(&placed_location(&self.bag), 1.0);
        let size = self.bag.f64("--marker-size") * depth_factor(p.facing(), self.bag.f64("depth-scale"));
        let (ax, ay) = anchor(&self.bag);
        self.rect = Bounds::new(p.screen.x - ax * size, p.screen.y - ay * size, size, size);
        self.projected = Some(p);
        dirty
    }

    fn layer(&self) -> Layered {
        let hidden = self.bag.bool("hidden");
        Layered {
            id: self.id,
            z_index: z_index(&self.bag),
            depth: self.projected.map_or(0.0, |p| p.camera.z),
            bounds: (!hidden && !self.rect.is_empty()).then_some(self.rect),
            occluded: self.projected.map_or(true, |p| p.is_occluded()),
        }
    }

    fn draw(&mut self, ctx: &FrameContext, front: &mut dyn Surface2d, back: &mut dyn Surface2d) {
        let Some(p) = self.projected else {
            return;
        };
        if self.bag.bool("hidden") || self.rect.is_empty() {
            return;
        }

        let rect = self.rect;
        let rotation = self.bag.f64("rotation").to_radians();
        let icon = self
            .bag
            .url("icon")
            .and_then(|url| ctx.resources.image(url).map(|img| (url, img)));
        let color = self.bag.color("--marker-color");

        let title = self.title_visible(ctx).then(|| {
            let font = Font {
                size: self.bag.f64("--title-size"),
                ..Font::default()
            };
            let pos = Vector2::new(rect.center().x, rect.y + rect.h + TITLE_GAP);
            (self.bag.str("title"), font, pos, self.bag.color("--title-color"))
        });

        ctx.paint_split(p.facing(), front, back, |s| {
            match icon {
                Some((url, img)) => s.image(url, img, rect, rotation),
                None => s.circle(rect.center(), rect.w / 2.0, color),
            }
            if let Some((text, font, pos, color)) = title {
                s.fill_text(text, pos, font, TextAlign::Center, color);
            }
        });
    }

    fn urls(&self) -> Vec<String> {
        self.bag.url("icon").map(str::to_string).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::view::{DrawCommand, DrawList};

    fn marker(el: &Element, fx: &Fixture) -> Marker {
        let mut m = Marker::new(ElementId(7));
        m.update(el, 0.0, &fx.ctx());
        m
    }

    #[test]
    fn centred_on_projected_location() {
        let fx = Fixture::new();
        let m = marker(&Element::new().with_style("--marker-size", "20"), &fx);
        let r = m.rect();
        assert_eq!((r.x, r.y, r.w, r.h), (390.0, 290.0, 20.0, 20.0));
        let layer = m.layer();
        assert!(!layer.occluded);
        assert_eq!(layer.bounds, Some(r));
    }

    #[test]
    fn far_side_shrinks_and_is_occluded() {
        let fx = Fixture::new();
        let m = marker(&Element::new().with_attribute("location", "0 180"), &fx);
        assert!((m.rect().w - 8.0).abs() < 1e-9);
        assert!(m.layer().occluded);
    }

    #[test]
    fn anchor_moves_the_icon() {
        let fx = Fixture::new();
        let m = marker(&Element::new().with_attribute("anchor", "0 1"), &fx);
        let r = m.rect();
        assert_eq!((r.x, r.y), (400.0, 284.0));
    }

    #[test]
    fn dot_fallback_and_hover_title() {
        let fx = Fixture::new();
        let el = Element::new().with_attribute("title", "Tokyo");
        let mut m = marker(&el, &fx);
        let (mut front, mut back) = (DrawList::new(), DrawList::new());

        m.draw(&fx.ctx(), &mut front, &mut back);
        assert!(matches!(front.commands.as_slice(), [DrawCommand::Circle { .. }]));
        assert!(back.is_empty());

        front.clear();
        let mut ctx = fx.ctx();
        ctx.hovered = Some(ElementId(7));
        m.draw(&ctx, &mut front, &mut back);
        assert!(matches!(
            front.commands.as_slice(),
            [DrawCommand::Circle { .. }, DrawCommand::FillText { text, .. }] if text == "Tokyo"
        ));
    }

    #[test]
    fn icon_url_is_requested() {
        let fx = Fixture::new();
        let m = marker(&Element::new().with_attribute("icon", "url('pin.png')"), &fx);
        assert_eq!(m.urls(), vec!["pin.png".to_string()]);
    }
}
