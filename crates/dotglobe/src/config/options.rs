//! The globe element's option table and its typed snapshot.

use super::{Invalidate as I, Kind, Property, PropertyBag, Value};
use crate::math::{Color, Location};

pub const QUALITIES: &[&str] = &["low", "medium", "high"];
pub const ANIMATION_MODES: &[&str] = &["none", "offset", "jitter", "size", "opacity", "color"];
pub const BLEND_MODES: &[&str] = &[
    "none",
    "replace",
    "multiply",
    "average",
    "alpha-high",
    "alpha-low",
];

fn keyword_index(words: &[&str], s: &str) -> usize {
    words.iter().position(|w| *w == s).unwrap_or(0)
}

/// Rendering quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn from_keyword(s: &str) -> Self {
        match s {
            "low" => Quality::Low,
            "high" => Quality::High,
            _ => Quality::Medium,
        }
    }

    /// Upper bound on the device pixel ratio the surfaces use.
    pub fn max_pixel_ratio(self) -> f64 {
        match self {
            Quality::Low => 1.0,
            Quality::Medium => 2.0,
            Quality::High => 3.0,
        }
    }

    /// Multiplier on arc subdivision counts.
    pub fn detail(self) -> f64 {
        match self {
            Quality::Low => 0.5,
            Quality::Medium => 1.0,
            Quality::High => 1.5,
        }
    }
}

/// Ambient per-point animation; discriminants are the shader's mode codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum AnimationMode {
    #[default]
    None = 0,
    Offset = 1,
    Jitter = 2,
    Size = 3,
    Opacity = 4,
    Color = 5,
}

impl AnimationMode {
    pub fn from_keyword(s: &str) -> Self {
        const ALL: [AnimationMode; 6] = [
            AnimationMode::None,
            AnimationMode::Offset,
            AnimationMode::Jitter,
            AnimationMode::Size,
            AnimationMode::Opacity,
            AnimationMode::Color,
        ];
        ALL[keyword_index(ANIMATION_MODES, s)]
    }
}

/// How a point sprite's texel combines with the point color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum BlendMode {
    #[default]
    None = 0,
    Replace = 1,
    Multiply = 2,
    Average = 3,
    AlphaHigh = 4,
    AlphaLow = 5,
}

impl BlendMode {
    pub fn from_keyword(s: &str) -> Self {
        const ALL: [BlendMode; 6] = [
            BlendMode::None,
            BlendMode::Replace,
            BlendMode::Multiply,
            BlendMode::Average,
            BlendMode::AlphaHigh,
            BlendMode::AlphaLow,
        ];
        ALL[keyword_index(BLEND_MODES, s)]
    }
}

fn float(min: f64, max: f64, default: f64) -> (Kind, Value) {
    (Kind::float(min, max), Value::Float(default))
}

fn attr((kind, default): (Kind, Value), name: &'static str) -> Property {
    Property::attr(name, kind, default)
}

fn style((kind, default): (Kind, Value), name: &'static str) -> Property {
    Property::style(name, kind, default)
}

/// Every option the globe element understands.
pub fn globe_properties() -> Vec<Property> {
    let url = || (Kind::Url, Value::None);
    let flag = |on: bool| (Kind::Bool, Value::Bool(on));
    let locations = || (Kind::Locations, Value::Locations(Vec::new()));

    vec![
        attr(float(0.0, 1.0, 0.5), "density").invalidates(I::FIELD),
        Property::attr("quality", Kind::Keyword(QUALITIES), Value::Keyword("medium"))
            .invalidates(I::VIEW),
        attr(float(0.1, 10.0, 1.0), "scale").invalidates(I::VIEW),
        attr(float(0.0, 5.0, 1.0), "drag"),
        attr(float(0.0, 90.0, 80.0), "lat-limit"),
        attr(float(0.0, 1.0, 0.1), "damping"),
        attr(float(-90.0, 90.0, 0.0), "tilt"),
        Property::attr("center", Kind::Location, Value::Location(Location::default()))
            .invalidates(I::CENTER),
        attr(url(), "background").invalidates(I::RESOURCES),
        attr(url(), "foreground").invalidates(I::RESOURCES),
        attr(flag(false), "autorotate"),
        attr(float(-360.0, 360.0, 6.0), "autorotate-speed"),
        attr(float(0.0, 60.0, 2.0), "autorotate-delay"),
        attr((Kind::float(-90.0, 90.0), Value::None), "autorotate-latitude"),
        Property::attr("animation", Kind::Keyword(ANIMATION_MODES), Value::Keyword("none")),
        attr(float(0.0, 10.0, 1.0), "animation-speed"),
        attr(float(0.01, 10.0, 1.0), "animation-scale"),
        attr(float(0.0, 1.0, 0.5), "animation-intensity"),
        attr(locations(), "add-points").invalidates(I::FIELD),
        attr(locations(), "remove-points").invalidates(I::FIELD),
        attr(flag(true), "polar-cap").invalidates(I::FIELD),
        attr(flag(false), "equator").invalidates(I::FIELD),
        attr(float(0.0, 1.0, 0.05), "map-height").invalidates(I::FIELD),
        attr(url(), "color-map").invalidates(I::RESOURCES | I::FIELD),
        attr(url(), "opacity-map").invalidates(I::RESOURCES | I::FIELD),
        style(float(0.0, 32.0, 1.5), "--point-size"),
        style((Kind::Color, Value::Color(Color::WHITE)), "--point-color").invalidates(I::FIELD),
        style(float(0.0, 1.0, 1.0), "--point-opacity").invalidates(I::FIELD),
        style(url(), "--point-texture").invalidates(I::RESOURCES),
        Property::style("--point-blend", Kind::Keyword(BLEND_MODES), Value::Keyword("none")),
        style((Kind::Color, Value::Color(Color::BLACK)), "--backside-color"),
        style(float(0.0, 1.0, 0.5), "--backside-opacity"),
        style(float(0.0, 1.0, 0.1), "--backside-transition"),
        style(float(0.0, 1.0, 0.15), "--edge-fade"),
        style((Kind::Color, Value::Color(Color::BLACK)), "--background-color"),
    ]
}

/// Typed snapshot of the globe options, rebuilt after every update.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeSettings {
    pub density: f64,
    pub quality: Quality,
    pub scale: f64,
    pub drag: f64,
    pub lat_limit: f64,
    pub damping: f64,
    pub tilt: f64,
    pub center: Location,
    pub background: Option<String>,
    pub foreground: Option<String>,
    pub autorotate: bool,
    pub autorotate_speed: f64,
    pub autorotate_delay: f64,
    pub autorotate_latitude: Option<f64>,
    pub animation: AnimationMode,
    pub animation_speed: f64,
    pub animation_scale: f64,
    pub animation_intensity: f64,
    pub add_points: Vec<Location>,
    pub remove_points: Vec<Location>,
    pub polar_cap: bool,
    pub equator: bool,
    pub map_height: f64,
    pub color_map: Option<String>,
    pub opacity_map: Option<String>,
    pub point_size: f64,
    pub point_color: Color,
    pub point_opacity: f64,
    pub point_texture: Option<String>,
    pub point_blend: BlendMode,
    pub backside_color: Color,
    pub backside_opacity: f64,
    pub backside_transition: f64,
    pub edge_fade: f64,
    pub background_color: Color,
}

impl Default for GlobeSettings {
    fn default() -> Self {
        Self::from_bag(&PropertyBag::new(globe_properties()))
    }
}

impl GlobeSettings {
    pub fn from_bag(bag: &PropertyBag) -> Self {
        let url = |name: &str| bag.url(name).map(str::to_string);
        Self {
            density: bag.f64("density"),
            quality: Quality::from_keyword(bag.str("quality")),
            scale: bag.f64("scale"),
            drag: bag.f64("drag"),
            lat_limit: bag.f64("lat-limit"),
            damping: bag.f64("damping"),
            tilt: bag.f64("tilt"),
            center: bag.location("center").unwrap_or_default(),
            background: url("background"),
            foreground: url("foreground"),
            autorotate: bag.bool("autorotate"),
            autorotate_speed: bag.f64("autorotate-speed"),
            autorotate_delay: bag.f64("autorotate-delay"),
            autorotate_latitude: bag.opt_f64("autorotate-latitude"),
            animation: AnimationMode::from_keyword(bag.str("animation")),
            animation_speed: bag.f64("animation-speed"),
            animation_scale: bag.f64("animation-scale"),
            animation_intensity: bag.f64("animation-intensity"),
            add_points: bag.locations("add-points").to_vec(),
            remove_points: bag.locations("remove-points").to_vec(),
            polar_cap: bag.bool("polar-cap"),
            equator: bag.bool("equator"),
            map_height: bag.f64("map-height"),
            color_map: url("color-map"),
            opacity_map: url("opacity-map"),
            point_size: bag.f64("--point-size"),
            point_color: bag.color("--point-color"),
            point_opacity: bag.f64("--point-opacity"),
            point_texture: url("--point-texture"),
            point_blend: BlendMode::from_keyword(bag.str("--point-blend")),
            backside_color: bag.color("--backside-color"),
            backside_opacity: bag.f64("--backside-opacity"),
            backside_transition: bag.f64("--backside-transition"),
            edge_fade: bag.f64("--edge-fade"),
            background_color: bag.color("--background-color"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Element;

    #[test]
    fn defaults() {
        let s = GlobeSettings::default();
        assert_eq!(s.density, 0.5);
        assert_eq!(s.quality, Quality::Medium);
        assert_eq!(s.lat_limit, 80.0);
        assert_eq!(s.map_height, 0.05);
        assert!(s.polar_cap);
        assert!(!s.equator);
        assert_eq!(s.autorotate_latitude, None);
        assert_eq!(s.point_color, Color::WHITE);
        assert_eq!(s.color_map, None);
    }

    #[test]
    fn declarative_values_flow_into_settings() {
        let mut bag = PropertyBag::new(globe_properties());
        let el = Element::new()
            .with_attribute("density", "2")
            .with_attribute("animation", "jitter")
            .with_attribute("autorotate", "")
            .with_attribute("autorotate-latitude", "20")
            .with_attribute("color-map", "url(maps/earth.png)")
            .with_attribute("add-points", "0 0, 10 10")
            .with_style("--point-blend", "alpha-low")
            .with_style("--point-color", "#ff0000");
        let dirty = bag.update(&el, 0.0);
        assert!(dirty.contains(I::FIELD));
        assert!(dirty.contains(I::RESOURCES));

        let s = GlobeSettings::from_bag(&bag);
        assert_eq!(s.density, 1.0);
        assert_eq!(s.animation, AnimationMode::Jitter);
        assert!(s.autorotate);
        assert_eq!(s.autorotate_latitude, Some(20.0));
        assert_eq!(s.color_map.as_deref(), Some("maps/earth.png"));
        assert_eq!(s.add_points.len(), 2);
        assert_eq!(s.point_blend, BlendMode::AlphaLow);
        assert_eq!(s.point_color, Color::rgb(255, 0, 0));
    }

    #[test]
    fn shader_codes_follow_keyword_order() {
        for (i, word) in ANIMATION_MODES.iter().enumerate() {
            assert_eq!(AnimationMode::from_keyword(word) as usize, i);
        }
        for (i, word) in BLEND_MODES.iter().enumerate() {
            assert_eq!(BlendMode::from_keyword(word) as usize, i);
        }
    }
}
