//! Drag panning of the camera center, with an inertial slide on release.

use crate::math::{wrap_lng, Location, Vector2};
use std::f64::consts::PI;

/// Damping is specified per frame at this rate.
pub const FRAME_RATE: f64 = 60.0;
/// Slides slower than this (degrees per second) stop.
pub const STOP_SPEED: f64 = 0.01;

/// Degrees of arc per CSS pixel of drag.
pub fn degrees_per_pixel(drag: f64, radius_px: f64) -> f64 {
    drag * 180.0 / (PI * radius_px.max(1.0))
}

/// Camera-center change `(dlat, dlng)` for a drag of `delta` pixels: the
/// surface under the pointer follows it.
pub fn drag_delta(delta: Vector2, drag: f64, radius_px: f64) -> (f64, f64) {
    let k = degrees_per_pixel(drag, radius_px);
    (delta.y * k, -delta.x * k)
}

/// Moves `center` by a delta, clamping latitude to `±lat_limit`.
pub fn apply(center: Location, (dlat, dlng): (f64, f64), lat_limit: f64) -> Location {
    Location {
        lat: (center.lat + dlat).clamp(-lat_limit, lat_limit),
        lng: wrap_lng(center.lng + dlng),
        offset: center.offset,
    }
}

#[derive(Debug, Default)]
pub struct Panning {
    /// Degrees per second, `(lat, lng)`.
    velocity: (f64, f64),
}

impl Panning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sliding(&self) -> bool {
        self.velocity != (0.0, 0.0)
    }

    pub fn velocity(&self) -> (f64, f64) {
        self.velocity
    }

    /// Seeds the slide from a release velocity in px/s.
    pub fn release(&mut self, velocity_px: Vector2, drag: f64, radius_px: f64) {
        self.velocity = drag_delta(velocity_px, drag, radius_px);
        if speed(self.velocity) < STOP_SPEED {
            self.stop();
        }
    }

    pub fn stop(&mut self) {
        self.velocity = (0.0, 0.0);
    }

    /// Advances the slide by `dt` seconds; returns the center delta, if any.
    pub fn step(&mut self, dt: f64, damping: f64) -> Option<(f64, f64)> {
        if !self.is_sliding() || dt <= 0.0 {
            return None;
        }
        let delta = (self.velocity.0 * dt, self.velocity.1 * dt);
        let decay = (1.0 - damping.clamp(0.0, 1.0)).powf(dt * FRAME_RATE);
        self.velocity = (self.velocity.0 * decay, self.velocity.1 * decay);
        if speed(self.velocity) < STOP_SPEED {
            self.stop();
        }
        Some(delta)
    }
}

fn speed((lat, lng): (f64, f64)) -> f64 {
    lat.hypot(lng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::Speedometer;

    #[test]
    fn drag_moves_center_against_the_pointer() {
        let (dlat, dlng) = drag_delta(Vector2::new(10.0, -10.0), 1.0, 100.0);
        assert!(dlng < 0.0 && dlat < 0.0);
        // Half a circumference of drag spans 180 degrees.
        let (_, dlng) = drag_delta(Vector2::new(-PI * 100.0, 0.0), 1.0, 100.0);
        assert!((dlng - 180.0).abs() < 1e-9);
    }

    #[test]
    fn latitude_is_clamped_and_longitude_wraps() {
        let c = apply(Location::new(70.0, 170.0), (30.0, 20.0), 80.0);
        assert_eq!(c.lat, 80.0);
        assert!((c.lng + 170.0).abs() < 1e-9);
    }

    #[test]
    fn release_of_a_fast_drag_slides_then_stops() {
        // 200 px over 100 ms, sampled every 20 ms.
        let mut speedo = Speedometer::new();
        for i in 0..=5 {
            speedo.record(i as f64 * 0.02, Vector2::new(i as f64 * 40.0, 0.0));
        }
        let v = speedo.velocity(0.1);
        assert!(v.x > 0.0);

        let mut pan = Panning::new();
        pan.release(v, 1.0, 250.0);
        let (_, lng0) = pan.velocity();
        assert!(lng0.abs() > 1.0);

        let mut frames = 0;
        while pan.step(1.0 / FRAME_RATE, 0.1).is_some() {
            frames += 1;
            assert!(frames < 200, "slide did not settle");
        }
        assert!(!pan.is_sliding());
        assert!(frames > 10);
    }

    #[test]
    fn full_damping_stops_on_the_first_frame() {
        let mut pan = Panning::new();
        pan.release(Vector2::new(500.0, 0.0), 1.0, 250.0);
        assert!(pan.step(1.0 / FRAME_RATE, 1.0).is_some());
        assert!(!pan.is_sliding());
    }
}
