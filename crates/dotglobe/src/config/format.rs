//! Typed coercion of raw attribute/style strings.

use crate::math::{Color, Location};

/// The closed set of option types a property can declare.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Bool,
    Keyword(&'static [&'static str]),
    String,
    Url,
    Color,
    Location,
    /// Comma-separated list of locations.
    Locations,
    /// Whitespace-separated homogeneous values.
    Array(Box<Kind>),
}

/// A coerced property value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Unset optional value.
    #[default]
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    Keyword(&'static str),
    String(String),
    Url(String),
    Color(Color),
    Location(Location),
    Locations(Vec<Location>),
    Array(Vec<Value>),
}

impl Kind {
    pub const fn float(min: f64, max: f64) -> Kind {
        Kind::Float { min, max }
    }

    pub const fn int(min: i64, max: i64) -> Kind {
        Kind::Int { min, max }
    }

    /// Coerces `raw`; `None` means the caller falls back to the default.
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        let s = raw.trim();
        match self {
            Kind::Int { min, max } => {
                let v: f64 = s.parse().ok().filter(|v: &f64| v.is_finite())?;
                Some(Value::Int((v.round() as i64).clamp(*min, *max)))
            }
            Kind::Float { min, max } => {
                let v: f64 = s.parse().ok().filter(|v: &f64| v.is_finite())?;
                Some(Value::Float(v.clamp(*min, *max)))
            }
            Kind::Bool => match s.to_ascii_lowercase().as_str() {
                "" | "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                _ => None,
            },
            Kind::Keyword(words) => {
                let lower = s.to_ascii_lowercase();
                words
                    .iter()
                    .find(|w| **w == lower)
                    .map(|w| Value::Keyword(*w))
            }
            Kind::String => Some(Value::String(raw.to_string())),
            Kind::Url => Some(match unwrap_url(s) {
                "" => Value::None,
                url => Value::Url(url.to_string()),
            }),
            Kind::Color => Color::try_parse(s).map(Value::Color),
            Kind::Location => Location::try_parse(s).map(Value::Location),
            Kind::Locations => s
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(Location::try_parse)
                .collect::<Option<Vec<_>>>()
                .map(Value::Locations),
            Kind::Array(inner) => s
                .split_whitespace()
                .map(|p| inner.coerce(p))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

/// Strips a CSS-style `url(...)` wrapper and optional quotes.
pub fn unwrap_url(s: &str) -> &str {
    let s = s.trim();
    let inner = s
        .strip_prefix("url(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(s)
        .trim();
    for q in ['"', '\''] {
        if let Some(unquoted) = inner.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return unquoted;
        }
    }
    inner
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(v.round() as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Keyword(s) => Some(s),
            Value::String(s) | Value::Url(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<Location> {
        match self {
            Value::Location(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_locations(&self) -> &[Location] {
        match self {
            Value::Locations(l) => l,
            _ => &[],
        }
    }

    pub fn as_array(&self) -> &[Value] {
        match self {
            Value::Array(v) => v,
            _ => &[],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Interpolates between two values of the same interpolable type.
    /// Locations travel along the great circle when `shortest_path` is set.
    pub fn lerp(&self, to: &Value, t: f64, shortest_path: bool) -> Option<Value> {
        match (self, to) {
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(a + (b - a) * t)),
            (Value::Int(a), Value::Int(b)) => {
                Some(Value::Int((*a as f64 + (*b - *a) as f64 * t).round() as i64))
            }
            (Value::Color(a), Value::Color(b)) => Some(Value::Color(a.lerp(*b, t))),
            (Value::Location(a), Value::Location(b)) => Some(Value::Location(a.lerp(b, t, shortest_path))),
            _ => None,
        }
    }

    /// Raw string form, suitable for writing back into an element.
    pub fn to_raw(&self) -> String {
        match self {
            Value::None => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Keyword(s) => s.to_string(),
            Value::String(s) | Value::Url(s) => s.clone(),
            Value::Color(c) => format!("#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a),
            Value::Location(l) => location_raw(l),
            Value::Locations(ls) => ls.iter().map(location_raw).collect::<Vec<_>>().join(", "),
            Value::Array(vs) => vs.iter().map(Value::to_raw).collect::<Vec<_>>().join(" "),
        }
    }
}

fn location_raw(l: &Location) -> String {
    if l.offset == 0.0 {
        format!("{} {}", l.lat, l.lng)
    } else {
        format!("{} {} {}", l.lat, l.lng, l.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_clamp() {
        assert_eq!(Kind::float(0.0, 1.0).coerce("1.5"), Some(Value::Float(1.0)));
        assert_eq!(Kind::float(0.0, 1.0).coerce(" 0.25 "), Some(Value::Float(0.25)));
        assert_eq!(Kind::float(0.0, 1.0).coerce("abc"), None);
        assert_eq!(Kind::float(0.0, 1.0).coerce("inf"), None);
        assert_eq!(Kind::int(1, 5).coerce("7"), Some(Value::Int(5)));
        assert_eq!(Kind::int(1, 5).coerce("2.6"), Some(Value::Int(3)));
    }

    #[test]
    fn booleans() {
        for raw in ["", "true", "ON", "1", "yes"] {
            assert_eq!(Kind::Bool.coerce(raw), Some(Value::Bool(true)), "{raw}");
        }
        for raw in ["false", "0", "off", "No"] {
            assert_eq!(Kind::Bool.coerce(raw), Some(Value::Bool(false)), "{raw}");
        }
        assert_eq!(Kind::Bool.coerce("maybe"), None);
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let kind = Kind::Keyword(&["low", "medium", "high"]);
        assert_eq!(kind.coerce("HIGH"), Some(Value::Keyword("high")));
        assert_eq!(kind.coerce("ultra"), None);
    }

    #[test]
    fn urls_unwrap() {
        assert_eq!(Kind::Url.coerce("url('a/b.png')"), Some(Value::Url("a/b.png".into())));
        assert_eq!(Kind::Url.coerce("url(\"x.jpg\")"), Some(Value::Url("x.jpg".into())));
        assert_eq!(Kind::Url.coerce(" plain.png "), Some(Value::Url("plain.png".into())));
        assert_eq!(Kind::Url.coerce(""), Some(Value::None));
        assert_eq!(Kind::Url.coerce("url()"), Some(Value::None));
    }

    #[test]
    fn location_lists() {
        let v = Kind::Locations.coerce("10 20, -5 30 0.1").expect("valid list");
        assert_eq!(
            v.as_locations(),
            &[Location::new(10.0, 20.0), Location::new(-5.0, 30.0).with_offset(0.1)]
        );
        assert_eq!(Kind::Locations.coerce(""), Some(Value::Locations(vec![])));
        assert_eq!(Kind::Locations.coerce("1 2, nope"), None);
    }

    #[test]
    fn arrays_are_homogeneous() {
        let kind = Kind::Array(Box::new(Kind::float(0.0, 1.0)));
        assert_eq!(
            kind.coerce("0 0.5 2"),
            Some(Value::Array(vec![Value::Float(0.0), Value::Float(0.5), Value::Float(1.0)]))
        );
        assert_eq!(kind.coerce("0 x"), None);
    }

    #[test]
    fn raw_form_coerces_back() {
        let values = [
            (Kind::Color, Value::Color(Color::rgba(1, 2, 3, 4))),
            (Kind::Location, Value::Location(Location::new(1.5, -2.0).with_offset(0.2))),
            (Kind::float(-10.0, 10.0), Value::Float(-2.5)),
        ];
        for (kind, value) in values {
            assert_eq!(kind.coerce(&value.to_raw()), Some(value));
        }
    }
}
