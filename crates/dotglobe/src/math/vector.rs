use std::ops::{Add, Mul, Neg, Sub};

use super::Location;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, o: Self) -> f64 {
        self.x * o.x + self.y * o.y
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, o: Self) -> f64 {
        (self - o).length()
    }

    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            self
        }
    }

    pub fn angle_between(self, o: Self) -> f64 {
        let denom = self.length() * o.length();
        if denom == 0.0 {
            return 0.0;
        }
        (self.dot(o) / denom).clamp(-1.0, 1.0).acos()
    }

    pub fn lerp(self, o: Self, t: f64) -> Self {
        self + (o - self) * t
    }
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Places a location on the unit sphere, lifted radially by
    /// `location.offset * relief`.
    ///
    /// +Y is the north pole and (0°, 0°) lies on +Z.
    pub fn from_location(location: &Location, relief: f64) -> Self {
        let (sin_lat, cos_lat) = location.lat.to_radians().sin_cos();
        let (sin_lng, cos_lng) = location.lng.to_radians().sin_cos();
        let r = 1.0 + location.offset * relief;
        Self::new(cos_lat * sin_lng * r, sin_lat * r, cos_lat * cos_lng * r)
    }

    #[inline]
    pub fn dot(self, o: Self) -> f64 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn cross(self, o: Self) -> Self {
        Self::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, o: Self) -> f64 {
        (self - o).length()
    }

    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            self
        }
    }

    /// Angle in radians, with the cosine clamped so rounding never yields NaN.
    pub fn angle_between(self, o: Self) -> f64 {
        let denom = self.length() * o.length();
        if denom == 0.0 {
            return 0.0;
        }
        (self.dot(o) / denom).clamp(-1.0, 1.0).acos()
    }

    pub fn lerp(self, o: Self, t: f64) -> Self {
        self + (o - self) * t
    }

    pub fn xy(self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn to_f32(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

macro_rules! impl_ops {
    ($t:ident { $($f:ident),+ }) => {
        impl Add for $t {
            type Output = $t;
            fn add(self, o: $t) -> $t {
                $t { $($f: self.$f + o.$f),+ }
            }
        }

        impl Sub for $t {
            type Output = $t;
            fn sub(self, o: $t) -> $t {
                $t { $($f: self.$f - o.$f),+ }
            }
        }

        impl Mul<f64> for $t {
            type Output = $t;
            fn mul(self, s: f64) -> $t {
                $t { $($f: self.$f * s),+ }
            }
        }

        impl Neg for $t {
            type Output = $t;
            fn neg(self) -> $t {
                $t { $($f: -self.$f),+ }
            }
        }
    };
}

impl_ops!(Vector2 { x, y });
impl_ops!(Vector3 { x, y, z });

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn location_axes() {
        let v = Vector3::from_location(&Location::new(0.0, 0.0), 1.0);
        assert_close(v.z, 1.0, 1e-12);

        let v = Vector3::from_location(&Location::new(0.0, 90.0), 1.0);
        assert_close(v.x, 1.0, 1e-12);

        let v = Vector3::from_location(&Location::new(90.0, 0.0), 1.0);
        assert_close(v.y, 1.0, 1e-12);
    }

    #[test]
    fn offset_lifts_radially() {
        let loc = Location::new(12.0, 34.0).with_offset(0.5);
        assert_close(Vector3::from_location(&loc, 0.2).length(), 1.1, 1e-12);
        assert_close(Vector3::from_location(&loc, 0.0).length(), 1.0, 1e-12);
    }

    #[test]
    fn angle_between_is_clamped() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(a.angle_between(a * 3.0), 0.0);
        assert_close(a.angle_between(-a), std::f64::consts::PI, 1e-12);
        assert_close(
            Vector2::new(1.0, 0.0).angle_between(Vector2::new(0.0, 2.0)),
            std::f64::consts::FRAC_PI_2,
            1e-12,
        );
    }

    #[test]
    fn algebra() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(-1.0, 0.5, 2.0);
        assert_eq!(a + b - b, a);
        assert_close(a.dot(b), 6.0, 1e-12);
        assert_close(a.cross(b).dot(a), 0.0, 1e-12);
        assert_close(a.normalize().length(), 1.0, 1e-12);
        assert_close(Vector2::new(3.0, 4.0).distance(Vector2::ZERO), 5.0, 1e-12);
    }
}
