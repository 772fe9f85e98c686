use super::{
    anchor, anchor_property, anchored_properties, depth_factor, placed_location, z_index,
    FrameContext, SceneObject,
};
use crate::config::{Element, ElementId, ElementKind, Invalidate, Kind, Property, PropertyBag, Value};
use crate::math::{Bounds, Color, Vector2};
use crate::view::{Font, FontFamily, Layered, Projected, Surface2d, TextAlign};

const FAMILIES: &[&str] = &["proportional", "monospace"];

fn properties() -> Vec<Property> {
    let mut props = anchored_properties();
    props.extend([
        anchor_property(0.5, 0.5),
        Property::style("--font-size", Kind::float(1.0, 256.0), Value::Float(14.0))
            .invalidates(Invalidate::LAYOUT),
        Property::style("--font-family", Kind::Keyword(FAMILIES), Value::Keyword("proportional"))
            .invalidates(Invalidate::LAYOUT),
        Property::style("--text-color", Kind::Color, Value::Color(Color::WHITE)),
        Property::style("--outline-color", Kind::Color, Value::Color(Color::TRANSPARENT)),
        Property::style("--outline-width", Kind::float(0.0, 16.0), Value::Float(0.0)),
        Property::style("--line-height", Kind::float(0.5, 4.0), Value::Float(1.2)),
        Property::style("--padding", Kind::float(0.0, 128.0), Value::Float(0.0)),
    ]);
    props
}

/// Measured lines for one (text, font) pair.
#[derive(Debug, Clone, PartialEq)]
struct Metrics {
    text: String,
    font: Font,
    lines: Vec<(String, f64)>,
    width: f64,
}

/// A multi-line label pinned to a location.
pub struct Text {
    id: ElementId,
    bag: PropertyBag,
    content: String,
    projected: Option<Projected>,
    metrics: Option<Metrics>,
    bounds: Option<Bounds>,
}

impl Text {
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            bag: PropertyBag::new(properties()),
            content: String::new(),
            projected: None,
            metrics: None,
            bounds: None,
        }
    }

    fn font(&self) -> Font {
        Font {
            size: self.bag.f64("--font-size"),
            family: match self.bag.str("--font-family") {
                "monospace" => FontFamily::Monospace,
                _ => FontFamily::Proportional,
            },
        }
    }

    /// Measures only when the text or font changed since the last call.
    fn measure(&mut self, surface: &dyn Surface2d) -> Metrics {
        let font = self.font();
        if let Some(m) = &self.metrics {
            if m.text == self.content && m.font == font {
                return m.clone();
            }
        }

        let lines: Vec<(String, f64)> = self
            .content
            .split('\n')
            .map(|line| (line.to_string(), surface.measure_text(line, font).x))
            .collect();
        let width = lines.iter().map(|(_, w)| *w).fold(0.0, f64::max);
        let metrics = Metrics {
            text: self.content.clone(),
            font,
            lines,
            width,
        };
        self.metrics = Some(metrics.clone());
        metrics
    }

    /// Scale, padding, line height and screen rect of the text block.
    fn block(&self, p: &Projected, metrics: &Metrics) -> (f64, f64, f64, Bounds) {
        let scale = depth_factor(p.facing(), self.bag.f64("depth-scale"));
        let padding = self.bag.f64("--padding") * scale;
        let line_h = metrics.font.size * scale * self.bag.f64("--line-height");
        let (ax, ay) = anchor(&self.bag);
        let w = metrics.width * scale + padding * 2.0;
        let h = line_h * metrics.lines.len() as f64 + padding * 2.0;
        let bounds = Bounds::new(p.screen.x - ax * w, p.screen.y - ay * h, w, h);
        (scale, padding, line_h, bounds)
    }
}

impl SceneObject for Text {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Text
    }

    fn properties(&self) -> &PropertyBag {
        &self.bag
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    fn update(&mut self, element: &Element, dt: f64, ctx: &FrameContext) -> Invalidate {
        let mut dirty = self.bag.update(element, dt);
        if element.text != self.content {
            self.content.clone_from(&element.text);
            dirty |= Invalidate::LAYOUT;
        }
        let p = ctx.view.project(&placed_location(&self.bag), 1.0);
        self.projected = Some(p);

        // Follow the projection with the cached metrics; a changed text or
        // font is measured at the next draw.
        let font = self.font();
        self.bounds = match &self.metrics {
            Some(m) if m.text == self.content && m.font == font && !self.content.is_empty() => {
                Some(self.block(&p, m).3)
            }
            _ => None,
        };
        dirty
    }

    fn layer(&self) -> Layered {
        Layered {
            id: self.id,
            z_index: z_index(&self.bag),
            depth: self.projected.map_or(0.0, |p| p.camera.z),
            bounds: if self.bag.bool("hidden") { None } else { self.bounds },
            occluded: self.projected.map_or(true, |p| p.is_occluded()),
        }
    }

    fn draw(&mut self, ctx: &FrameContext, front: &mut dyn Surface2d, back: &mut dyn Surface2d) {
        let Some(p) = self.projected else {
            return;
        };
        if self.bag.bool("hidden") || self.content.is_empty() {
            self.bounds = None;
            return;
        }

        let (ax, _) = anchor(&self.bag);
        let color = self.bag.color("--text-color");
        let outline = self.bag.color("--outline-color");
        let outline_width = self.bag.f64("--outline-width");

        let metrics = self.measure(&*front);
        let (scale, padding, line_h, bounds) = self.block(&p, &metrics);
        let font = Font {
            size: metrics.font.size * scale,
            ..metrics.font
        };
        let (left, top, w) = (bounds.x, bounds.y, bounds.w);
        self.bounds = Some(bounds);

        let align = TextAlign::from_anchor(ax);
        let x = match align {
            TextAlign::Left => left + padding,
            TextAlign::Center => left + w / 2.0,
            TextAlign::Right => left + w - padding,
        };

        ctx.paint_split(p.facing(), front, back, |s| {
            for (i, (line, _)) in metrics.lines.iter().enumerate() {
                let pos = Vector2::new(x, top + padding + i as f64 * line_h);
                if outline_width > 0.0 && outline.a > 0 {
                    s.stroke_text(line, pos, font, align, outline, outline_width);
                }
                s.fill_text(line, pos, font, align, color);
            }
        });
    }
}
