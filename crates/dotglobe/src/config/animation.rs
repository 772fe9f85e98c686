//! Value animation: easing curves, options and the caller-facing handle.

use std::cell::Cell;
use std::f64::consts::PI;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

use super::Value;

/// Default duration for non-location animations, in seconds.
pub const DEFAULT_DURATION: f64 = 0.6;
/// Location animations take `BASE + PER_PI * angle / π` seconds.
pub const LOCATION_BASE_DURATION: f64 = 0.5;
pub const LOCATION_DURATION_PER_PI: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    /// Circular ease-out.
    Arc,
    /// Ease-out that overshoots slightly before settling.
    Back,
    Elastic,
    Bounce,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown easing `{0}`")]
pub struct UnknownEasing(pub String);

impl FromStr for Easing {
    type Err = UnknownEasing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Easing::Linear,
            "quad-in" => Easing::QuadIn,
            "quad-out" => Easing::QuadOut,
            "quad-in-out" => Easing::QuadInOut,
            "cubic-in" => Easing::CubicIn,
            "cubic-out" => Easing::CubicOut,
            "arc" => Easing::Arc,
            "back" => Easing::Back,
            "elastic" => Easing::Elastic,
            "bounce" => Easing::Bounce,
            _ => return Err(UnknownEasing(s.to_string())),
        })
    }
}

impl Easing {
    /// Maps linear progress in [0, 1] to eased progress; 0 and 1 are fixed points.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => (t - 1.0).powi(3) + 1.0,
            Easing::Arc => (1.0 - (1.0 - t).powi(2)).sqrt(),
            Easing::Back => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Easing::Elastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * (2.0 * PI / 3.0)).sin() + 1.0
                }
            }
            Easing::Bounce => bounce_out(t),
        }
    }
}

fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnimateOptions {
    /// Fixed duration in seconds; derived from the values when unset.
    pub duration: Option<f64>,
    pub easing: Easing,
    /// Locations travel the great circle; otherwise lat and lng are
    /// interpolated as plain numbers.
    pub shortest_path: bool,
}

impl Default for AnimateOptions {
    fn default() -> Self {
        Self {
            duration: None,
            easing: Easing::default(),
            shortest_path: true,
        }
    }
}

impl AnimateOptions {
    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds.max(0.0));
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn shortest_path(mut self, shortest_path: bool) -> Self {
        self.shortest_path = shortest_path;
        self
    }
}

/// Duration an animation between `from` and `to` pairs takes by default.
pub fn auto_duration<'a>(pairs: impl IntoIterator<Item = (&'a Value, &'a Value)>) -> f64 {
    let mut angle = None::<f64>;
    for (from, to) in pairs {
        if let (Value::Location(a), Value::Location(b)) = (from, to) {
            let a = a.angle_to(b);
            angle = Some(angle.map_or(a, |m| m.max(a)));
        }
    }
    match angle {
        Some(a) => LOCATION_BASE_DURATION + LOCATION_DURATION_PER_PI * a / PI,
        None => DEFAULT_DURATION,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Running,
    FinishRequested,
    CancelRequested,
    Done,
}

/// Caller-side handle of a running animation.
///
/// `finish` and `cancel` are requests; the owning property bag settles them
/// at its next update, before anything is drawn.
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    pub(crate) control: Rc<Cell<Control>>,
}

impl AnimationHandle {
    pub(crate) fn new() -> Self {
        Self {
            control: Rc::new(Cell::new(Control::Running)),
        }
    }

    /// A handle for an animation that had nothing to do.
    pub(crate) fn done() -> Self {
        Self {
            control: Rc::new(Cell::new(Control::Done)),
        }
    }

    /// Jump to the target values.
    pub fn finish(&self) {
        if self.control.get() == Control::Running {
            self.control.set(Control::FinishRequested);
        }
    }

    /// Restore the start values.
    pub fn cancel(&self) {
        if self.control.get() == Control::Running {
            self.control.set(Control::CancelRequested);
        }
    }

    pub fn is_active(&self) -> bool {
        self.control.get() != Control::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Location;

    const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::Arc,
        Easing::Back,
        Easing::Elastic,
        Easing::Bounce,
    ];

    #[test]
    fn easings_fix_endpoints() {
        for e in ALL {
            assert!(e.apply(0.0).abs() < 1e-9, "{e:?}");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-9, "{e:?}");
        }
    }

    #[test]
    fn easings_parse_from_kebab_case() {
        assert_eq!("quad-in-out".parse::<Easing>(), Ok(Easing::QuadInOut));
        assert_eq!(" Bounce ".parse::<Easing>(), Ok(Easing::Bounce));
        assert_eq!("wobble".parse::<Easing>(), Err(UnknownEasing("wobble".into())));
    }

    #[test]
    fn back_overshoots() {
        assert!((0..100).any(|i| Easing::Back.apply(i as f64 / 100.0) > 1.0));
    }

    #[test]
    fn location_duration_scales_with_distance() {
        let origin = Value::Location(Location::new(0.0, 0.0));
        let near = Value::Location(Location::new(0.0, 10.0));
        let far = Value::Location(Location::new(0.0, 180.0));
        let near_d = auto_duration([(&origin, &near)]);
        let far_d = auto_duration([(&origin, &far)]);
        assert!(near_d < far_d);
        assert!((far_d - 2.5).abs() < 1e-9);
        assert_eq!(auto_duration([(&Value::Float(0.0), &Value::Float(1.0))]), DEFAULT_DURATION);
    }

    #[test]
    fn handle_requests_only_while_running() {
        let h = AnimationHandle::new();
        assert!(h.is_active());
        h.cancel();
        h.finish();
        assert_eq!(h.control.get(), Control::CancelRequested);
        assert!(!AnimationHandle::done().is_active());
    }
}
