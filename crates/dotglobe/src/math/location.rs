use super::Vector3;

/// Mean Earth radius used for distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees plus a unitless radial offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    /// Lift above the surface, scaled by the globe's relief when placed in 3D.
    pub offset: f64,
}

impl Location {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            offset: 0.0,
        }
    }

    pub const fn with_offset(self, offset: f64) -> Self {
        Self { offset, ..self }
    }

    /// Parses `"lat lng [offset]"` or `"lat,lng[,offset]"`; malformed input is `(0, 0)`.
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_default()
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        let nums = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;

        match nums.as_slice() {
            [lat, lng] => Some(Self::new(*lat, *lng).fixed()),
            [lat, lng, offset] => Some(Self::new(*lat, *lng).with_offset(*offset).fixed()),
            _ => None,
        }
    }

    /// Clamps latitude to [-90, 90] and wraps longitude into (-180, 180].
    pub fn fix(&mut self) -> &mut Self {
        self.lat = self.lat.clamp(-90.0, 90.0);
        self.lng = wrap_lng(self.lng);
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fix();
        self
    }

    /// Equirectangular texture coordinate; `v = 0` at the north pole.
    pub fn uv(&self) -> (f64, f64) {
        ((self.lng + 180.0) / 360.0, 1.0 - (self.lat + 90.0) / 180.0)
    }

    /// Inverse of [`Vector3::from_location`] for the direction only; offset is zero.
    pub fn from_vector(v: Vector3) -> Self {
        let len = v.length();
        if len == 0.0 {
            return Self::default();
        }
        let lat = (v.y / len).clamp(-1.0, 1.0).asin().to_degrees();
        let lng = v.x.atan2(v.z).to_degrees();
        Self::new(lat, lng).fixed()
    }

    /// Interpolates toward `other`.
    ///
    /// With `shortest_path` the point travels along the great circle (3D blend,
    /// renormalized); otherwise latitude and longitude are blended numerically.
    pub fn lerp(&self, other: &Location, t: f64, shortest_path: bool) -> Location {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }

        let offset = self.offset + (other.offset - self.offset) * t;

        if shortest_path {
            let a = Vector3::from_location(&self.with_offset(0.0), 0.0);
            let b = Vector3::from_location(&other.with_offset(0.0), 0.0);
            let p = a.lerp(b, t);
            // Antipodal endpoints have no unique great circle.
            if p.length() > 1e-9 {
                return Location::from_vector(p).with_offset(offset);
            }
            return self.lerp_components(other, t);
        }

        Location::new(
            self.lat + (other.lat - self.lat) * t,
            self.lng + (other.lng - self.lng) * t,
        )
        .with_offset(offset)
        .fixed()
    }

    /// Component-wise blend taking the shorter way around in longitude.
    pub fn lerp_components(&self, other: &Location, t: f64) -> Location {
        let dlng = shortest_delta(self.lng, other.lng);
        Location::new(
            self.lat + (other.lat - self.lat) * t,
            self.lng + dlng * t,
        )
        .with_offset(self.offset + (other.offset - self.offset) * t)
        .fixed()
    }

    /// Central angle to `other` in radians (haversine).
    pub fn angle_to(&self, other: &Location) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * h.sqrt().clamp(0.0, 1.0).asin()
    }

    pub fn distance_deg(&self, other: &Location) -> f64 {
        self.angle_to(other).to_degrees()
    }

    pub fn distance_km(&self, other: &Location) -> f64 {
        self.angle_to(other) * EARTH_RADIUS_KM
    }
}

/// Wraps a longitude into (-180, 180].
pub fn wrap_lng(lng: f64) -> f64 {
    if !lng.is_finite() {
        return 0.0;
    }
    let w = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if w == -180.0 {
        180.0
    } else {
        w
    }
}

/// Signed longitude difference `to - from` in (-180, 180].
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    wrap_lng(to - from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn parse_accepts_both_separators() {
        assert_eq!(Location::parse("10 20"), Location::new(10.0, 20.0));
        assert_eq!(Location::parse(" 10, -20 "), Location::new(10.0, -20.0));
        assert_eq!(Location::parse("1 2 0.5"), Location::new(1.0, 2.0).with_offset(0.5));
        assert_eq!(Location::parse("north"), Location::default());
        assert_eq!(Location::parse("1"), Location::default());
        assert_eq!(Location::parse("1 NaN"), Location::default());
    }

    #[test]
    fn fix_normalizes_ranges() {
        assert_eq!(Location::new(95.0, 190.0).fixed(), Location::new(90.0, -170.0));
        assert_eq!(Location::new(-100.0, -180.0).fixed(), Location::new(-90.0, 180.0));
        assert_eq!(Location::new(0.0, 540.0).fixed().lng, 180.0);
    }

    #[test]
    fn uv_corners() {
        assert_eq!(Location::new(90.0, -180.0).uv(), (0.0, 0.0));
        assert_eq!(Location::new(-90.0, 180.0).uv(), (1.0, 1.0));
        assert_eq!(Location::new(0.0, 0.0).uv(), (0.5, 0.5));
    }

    #[test]
    fn vector_round_trip_away_from_poles() {
        let mut lat = -89.0;
        while lat <= 89.0 {
            let mut lng = -179.0;
            while lng <= 180.0 {
                let loc = Location::new(lat, lng);
                let back = Location::from_vector(Vector3::from_location(&loc, 1.0));
                assert_close(back.lat, lat, 1e-4);
                assert_close(shortest_delta(back.lng, lng), 0.0, 1e-4);
                lng += 7.0;
            }
            lat += 4.5;
        }
    }

    #[test]
    fn pole_round_trip_keeps_latitude_only() {
        let back = Location::from_vector(Vector3::from_location(&Location::new(90.0, 45.0), 1.0));
        assert_close(back.lat, 90.0, 1e-4);
    }

    #[test]
    fn lerp_endpoints_are_exact() {
        let samples = [
            (Location::new(10.0, 20.0), Location::new(-30.0, 170.0)),
            (Location::new(0.0, 0.0), Location::new(0.0, 180.0)),
            (Location::new(89.0, -179.0), Location::new(-89.0, 179.0)),
        ];
        for (a, b) in samples {
            for shortest in [true, false] {
                assert_eq!(a.lerp(&b, 0.0, shortest), a);
                assert_eq!(a.lerp(&b, 1.0, shortest), b);
            }
        }
    }

    #[test]
    fn great_circle_and_component_paths_diverge() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(0.0, 170.0);

        let arc = a.lerp(&b, 0.25, true);
        let flat = a.lerp(&b, 0.25, false);
        assert!((arc.lng - flat.lng).abs() > 1.0, "{arc:?} vs {flat:?}");
        assert_eq!(a.lerp(&b, 1.0, true), a.lerp(&b, 1.0, false));
    }

    #[test]
    fn great_circle_crosses_antimeridian_component_path_does_not() {
        let a = Location::new(0.0, -170.0);
        let b = Location::new(0.0, 170.0);

        let arc = a.lerp(&b, 0.5, true);
        assert_close(arc.lng.abs(), 180.0, 1e-6);

        let flat = a.lerp(&b, 0.5, false);
        assert_close(flat.lng, 0.0, 1e-9);

        let wrapped = a.lerp_components(&b, 0.5);
        assert_close(wrapped.lng.abs(), 180.0, 1e-9);
    }

    #[test]
    fn distances() {
        let a = Location::new(0.0, 0.0);
        assert_close(a.distance_deg(&Location::new(0.0, 90.0)), 90.0, 1e-9);
        assert_close(a.distance_deg(&Location::new(0.0, 180.0)), 180.0, 1e-9);
        assert_close(a.distance_km(&Location::new(90.0, 0.0)), EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2, 1e-6);
    }
}
