//! Release-velocity estimate from the last few pointer samples.

use crate::math::Vector2;
use std::collections::VecDeque;

pub const SAMPLES: usize = 4;
/// Sample pairs further apart than this (seconds) are stale.
pub const MAX_GAP: f64 = 0.1;
/// Speeds below this many px/s count as standing still.
pub const MIN_SPEED: f64 = 10.0;

#[derive(Debug, Default)]
pub struct Speedometer {
    samples: VecDeque<(f64, Vector2)>,
}

impl Speedometer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a position at `time` seconds.
    pub fn record(&mut self, time: f64, pos: Vector2) {
        if self.samples.len() == SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((time, pos));
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Mean of the per-pair velocities in px/s, as of `now`.
    pub fn velocity(&self, now: f64) -> Vector2 {
        let Some(&(last, _)) = self.samples.back() else {
            return Vector2::ZERO;
        };
        if now - last > MAX_GAP {
            return Vector2::ZERO;
        }

        let mut sum = Vector2::ZERO;
        let mut n = 0;
        for (a, b) in self.samples.iter().zip(self.samples.iter().skip(1)) {
            let dt = b.0 - a.0;
            if dt <= 0.0 || dt > MAX_GAP {
                continue;
            }
            sum = sum + (b.1 - a.1) * (1.0 / dt);
            n += 1;
        }
        if n == 0 {
            return Vector2::ZERO;
        }

        let v = sum * (1.0 / n as f64);
        if v.length() < MIN_SPEED {
            Vector2::ZERO
        } else {
            v
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_drag_reports_its_speed() {
        let mut s = Speedometer::new();
        for i in 0..=5 {
            s.record(i as f64 * 0.02, Vector2::new(i as f64 * 40.0, 0.0));
        }
        let v = s.velocity(0.1);
        assert!((v.x - 2000.0).abs() < 1e-6);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn stale_samples_are_ignored() {
        let mut s = Speedometer::new();
        s.record(0.0, Vector2::new(0.0, 0.0));
        s.record(0.5, Vector2::new(100.0, 0.0));
        assert_eq!(s.velocity(0.5), Vector2::ZERO);

        s.record(0.55, Vector2::new(110.0, 0.0));
        assert!((s.velocity(0.55).x - 200.0).abs() < 1e-6);
        // Held still before release.
        assert_eq!(s.velocity(0.9), Vector2::ZERO);
    }

    #[test]
    fn slow_motion_is_zeroed() {
        let mut s = Speedometer::new();
        s.record(0.0, Vector2::new(0.0, 0.0));
        s.record(0.05, Vector2::new(0.2, 0.0));
        assert_eq!(s.velocity(0.05), Vector2::ZERO);
    }
}
