use super::{common_properties, z_index, FrameContext, SceneObject};
use crate::config::{Element, ElementId, ElementKind, Invalidate, Kind, Property, PropertyBag, Value};
use crate::math::{Bounds, Color, Location, Vector2};
use crate::view::{Layered, Projected, Surface2d};
use std::f64::consts::PI;

/// Segments per half turn of arc at offset 0, pixel ratio 1, medium quality.
const SEGMENTS_PER_PI: f64 = 48.0;
const MAX_SEGMENTS: usize = 1024;
/// Alpha runs are merged when they round to the same step.
const ALPHA_STEPS: f64 = 64.0;

fn properties() -> Vec<Property> {
    let mut props = common_properties();
    props.extend([
        Property::attr("from", Kind::Location, Value::Location(Location::default()))
            .invalidates(Invalidate::LAYOUT),
        Property::attr("to", Kind::Location, Value::None).invalidates(Invalidate::LAYOUT),
        Property::attr("offset", Kind::float(0.0, 10.0), Value::Float(0.1))
            .invalidates(Invalidate::LAYOUT),
        Property::attr(
            "clip",
            Kind::Array(Box::new(Kind::float(0.0, 1.0))),
            Value::Array(vec![Value::Float(0.0), Value::Float(1.0)]),
        ),
        Property::style("--line-color", Kind::Color, Value::Color(Color::WHITE)),
        Property::style("--line-width", Kind::float(0.0, 32.0), Value::Float(1.0)),
    ]);
    props
}

/// Arc segment count for an arc spanning `angle` radians.
pub fn segment_count(angle: f64, offset: f64, pixel_ratio: f64, detail: f64) -> usize {
    let n = (angle / PI * SEGMENTS_PER_PI * (1.0 + offset) * pixel_ratio * detail).ceil();
    (n.max(2.0) as usize).min(MAX_SEGMENTS)
}

/// Sample positions along the visible part of the line, surface to tip.
///
/// With a destination this is the great circle `from → to` lifted by
/// `offset · sin(πt)`; without one, a radial spike from the surface up to
/// `offset`. Only `t ∈ [clip.0, clip.1]` is sampled.
pub fn sample(
    from: Location,
    to: Option<Location>,
    offset: f64,
    clip: (f64, f64),
    segments: usize,
) -> Vec<Location> {
    let (start, end) = (clip.0.clamp(0.0, 1.0), clip.1.clamp(0.0, 1.0));
    if end <= start {
        return Vec::new();
    }

    let base = Location::new(from.lat, from.lng);
    match to {
        Some(to) => {
            let to = Location::new(to.lat, to.lng);
            (0..=segments)
                .map(|i| {
                    let t = start + (end - start) * i as f64 / segments as f64;
                    let p = base.lerp(&to, t, true);
                    p.with_offset(offset * (PI * t).sin())
                })
                .collect()
        }
        None => vec![base.with_offset(offset * start), base.with_offset(offset * end)],
    }
}

/// A great-circle arc between two locations, or a spike when there is no
/// destination.
pub struct Line {
    id: ElementId,
    bag: PropertyBag,
    projected: Vec<Projected>,
}

impl Line {
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            bag: PropertyBag::new(properties()),
            projected: Vec::new(),
        }
    }

    pub fn projected(&self) -> &[Projected] {
        &self.projected
    }

    fn clip(&self) -> (f64, f64) {
        let values = self.bag.get("clip").map(Value::as_array).unwrap_or(&[]);
        let at = |i: usize, d: f64| values.get(i).and_then(Value::as_f64).unwrap_or(d);
        (at(0, 0.0), at(1, 1.0))
    }
}

impl SceneObject for Line {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Line
    }

    fn properties(&self) -> &PropertyBag {
        &self.bag
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    fn update(&mut self, element: &Element, dt: f64, ctx: &FrameContext) -> Invalidate {
        let dirty = self.bag.update(element, dt);

        let from = self.bag.location("from").unwrap_or_default();
        let to = self.bag.location("to");
        let offset = self.bag.f64("offset");
        let segments = to.map_or(1, |to| {
            segment_count(
                from.angle_to(&to),
                offset,
                ctx.view.pixel_ratio(),
                ctx.settings.quality.detail(),
            )
        });

        self.projected = sample(from, to, offset, self.clip(), segments)
            .iter()
            .map(|loc| ctx.view.project(loc, 1.0))
            .collect();
        dirty
    }

    fn layer(&self) -> Layered {
        let n = self.projected.len().max(1) as f64;
        let width = self.bag.f64("--line-width");
        let bounds = if self.bag.bool("hidden") {
            None
        } else {
            Bounds::from_points(self.projected.iter().map(|p| p.screen), width / 2.0 + 2.0)
        };
        Layered {
            id: self.id,
            z_index: z_index(&self.bag),
            depth: self.projected.iter().map(|p| p.camera.z).sum::<f64>() / n,
            bounds,
            occluded: self.projected.iter().all(Projected::is_occluded),
        }
    }

    /// Each segment goes to the surfaces its midpoint faces; consecutive
    /// segments with the same weights are drawn as one polyline.
    fn draw(&mut self, ctx: &FrameContext, front: &mut dyn Surface2d, back: &mut dyn Surface2d) {
        if self.bag.bool("hidden") || self.projected.len() < 2 {
            return;
        }
        let color = self.bag.color("--line-color");
        let width = self.bag.f64("--line-width");

        let step = |facing: f64| {
            let (f, b) = ctx.alphas(facing);
            ((f * ALPHA_STEPS).round() as i32, (b * ALPHA_STEPS).round() as i32)
        };

        let mut run: Vec<Vector2> = Vec::new();
        let mut run_key = None;
        let mut run_facing = 1.0;

        for pair in self.projected.windows(2) {
            let facing = (pair[0].facing() + pair[1].facing()) / 2.0;
            let key = step(facing);
            if run_key != Some(key) {
                if run.len() >= 2 {
                    ctx.paint_split(run_facing, front, back, |s| s.polyline(&run, color, width));
                }
                run.clear();
                run.push(pair[0].screen);
                run_key = Some(key);
                run_facing = facing;
            }
            run.push(pair[1].screen);
        }
        if run.len() >= 2 {
            ctx.paint_split(run_facing, front, back, |s| s.polyline(&run, color, width));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::view::{DrawCommand, DrawList};

    #[test]
    fn segment_count_scales_with_distance_offset_and_density() {
        let base = segment_count(PI / 2.0, 0.0, 1.0, 1.0);
        assert_eq!(base, 24);
        assert!(segment_count(PI, 0.0, 1.0, 1.0) > base);
        assert!(segment_count(PI / 2.0, 1.0, 1.0, 1.0) > base);
        assert!(segment_count(PI / 2.0, 0.0, 2.0, 1.0) > base);
        assert!(segment_count(PI / 2.0, 0.0, 1.0, 0.5) < base);
        assert_eq!(segment_count(0.0, 0.0, 1.0, 1.0), 2);
    }

    #[test]
    fn arc_is_lifted_in_the_middle() {
        let pts = sample(Location::new(0.0, 0.0), Some(Location::new(0.0, 90.0)), 0.5, (0.0, 1.0), 4);
        assert_eq!(pts.len(), 5);
        assert!(pts[0].offset.abs() < 1e-12 && pts[4].offset.abs() < 1e-9);
        assert!((pts[2].offset - 0.5).abs() < 1e-12);
        assert!((pts[2].lng - 45.0).abs() < 1e-9);
    }

    #[test]
    fn clip_restricts_the_drawn_part() {
        let pts = sample(Location::new(0.0, 0.0), Some(Location::new(0.0, 90.0)), 0.0, (0.5, 1.0), 2);
        assert!((pts[0].lng - 45.0).abs() < 1e-9);
        assert!((pts[2].lng - 90.0).abs() < 1e-9);
        assert!(sample(Location::new(0.0, 0.0), None, 1.0, (0.6, 0.4), 1).is_empty());
    }

    #[test]
    fn spike_rises_from_the_surface() {
        let pts = sample(Location::new(10.0, 20.0), None, 0.3, (0.0, 1.0), 1);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].offset, 0.0);
        assert_eq!(pts[1].offset, 0.3);
        assert_eq!((pts[1].lat, pts[1].lng), (10.0, 20.0));
    }

    #[test]
    fn arc_over_the_horizon_splits_across_surfaces() {
        let fx = Fixture::new();
        let el = Element::new()
            .with_attribute("from", "0 0")
            .with_attribute("to", "0 170")
            .with_attribute("offset", "0");
        let mut line = Line::new(ElementId(3));
        line.update(&el, 0.0, &fx.ctx());
        let layer = line.layer();
        assert!(!layer.occluded);
        assert!(layer.bounds.is_some());

        let (mut front, mut back) = (DrawList::new(), DrawList::new());
        line.draw(&fx.ctx(), &mut front, &mut back);
        let count = |l: &DrawList| {
            l.commands
                .iter()
                .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
                .count()
        };
        assert!(count(&front) > 0);
        assert!(count(&back) > 0);
    }
}
