//! Idle rotation of the camera center.

use crate::math::{wrap_lng, Location};

/// Seconds over which rotation speed ramps in once idle.
pub const RAMP_TIME: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutorotateParams {
    pub enabled: bool,
    /// Degrees of longitude per second.
    pub speed: f64,
    /// Idle seconds before rotation starts.
    pub delay: f64,
    pub latitude: Option<f64>,
}

#[derive(Debug, Default)]
pub struct Autorotate {
    idle: f64,
    ramp: f64,
}

impl Autorotate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts the idle timer.
    pub fn interrupt(&mut self) {
        self.idle = 0.0;
        self.ramp = 0.0;
    }

    pub fn is_rotating(&self) -> bool {
        self.ramp > 0.0
    }

    /// Advances by `dt` seconds and returns the new center if it moved.
    /// `suppressed` is set while the pointer is captured or the globe slides.
    pub fn step(
        &mut self,
        dt: f64,
        params: &AutorotateParams,
        center: Location,
        suppressed: bool,
    ) -> Option<Location> {
        if !params.enabled || suppressed {
            self.interrupt();
            return None;
        }
        if dt <= 0.0 {
            return None;
        }

        self.idle += dt;
        if self.idle < params.delay {
            return None;
        }
        self.ramp = (self.ramp + dt / RAMP_TIME).min(1.0);

        let mut next = center;
        next.lng = wrap_lng(center.lng + params.speed * self.ramp * dt);
        if let Some(target) = params.latitude {
            let k = 1.0 - (-dt * self.ramp).exp();
            next.lat = center.lat + (target - center.lat) * k;
        }
        (next != center).then_some(next)
    }
}
