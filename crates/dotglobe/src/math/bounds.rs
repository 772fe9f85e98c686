use super::Vector2;

/// Axis-aligned screen rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Square of side `2 * radius` around `center`.
    pub fn around(center: Vector2, radius: f64) -> Self {
        Self::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
    }

    /// Edges are inclusive.
    pub fn within(&self, p: Vector2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.w).max(other.x + other.w);
        let bottom = (self.y + self.h).max(other.y + other.h);
        Bounds::new(x, y, right - x, bottom - y)
    }

    /// Smallest rectangle enclosing all points, grown by `pad` on every side.
    pub fn from_points(points: impl IntoIterator<Item = Vector2>, pad: f64) -> Option<Bounds> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let (mut min, mut max) = (first, first);
        for p in it {
            min = Vector2::new(min.x.min(p.x), min.y.min(p.y));
            max = Vector2::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some(Bounds::new(
            min.x - pad,
            min.y - pad,
            max.x - min.x + pad * 2.0,
            max.y - min.y + pad * 2.0,
        ))
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_inclusive() {
        let b = Bounds::new(10.0, 10.0, 20.0, 10.0);
        assert!(b.within(Vector2::new(10.0, 10.0)));
        assert!(b.within(Vector2::new(30.0, 20.0)));
        assert!(!b.within(Vector2::new(30.1, 20.0)));
        assert!(!b.within(Vector2::new(9.9, 15.0)));
    }

    #[test]
    fn union_and_from_points() {
        let a = Bounds::new(0.0, 0.0, 2.0, 2.0);
        let b = Bounds::new(5.0, -1.0, 1.0, 1.0);
        assert_eq!(a.union(&b), Bounds::new(0.0, -1.0, 6.0, 3.0));

        let pts = [Vector2::new(1.0, 4.0), Vector2::new(-2.0, 0.0), Vector2::new(3.0, 1.0)];
        assert_eq!(Bounds::from_points(pts, 1.0), Some(Bounds::new(-3.0, -1.0, 7.0, 6.0)));
        assert_eq!(Bounds::from_points(std::iter::empty(), 1.0), None);
    }
}
