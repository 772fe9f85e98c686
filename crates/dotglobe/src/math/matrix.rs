use super::Vector3;

/// Column-major 4×4 matrix; element `(row, col)` lives at `m[col * 4 + row]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f64; 16]);

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[rustfmt::skip]
const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

impl Matrix {
    pub const IDENTITY: Matrix = Matrix(IDENTITY);

    pub fn reset(&mut self) -> &mut Self {
        self.0 = IDENTITY;
        self
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.0[col * 4 + row]
    }

    /// `self * other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.at(row, k) * other.at(k, col);
                }
                out[col * 4 + row] = sum;
            }
        }
        Matrix(out)
    }

    #[rustfmt::skip]
    pub fn rotation_x(rad: f64) -> Matrix {
        let (s, c) = rad.sin_cos();
        Matrix([
            1.0, 0.0, 0.0, 0.0,
            0.0,   c,   s, 0.0,
            0.0,  -s,   c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    #[rustfmt::skip]
    pub fn rotation_y(rad: f64) -> Matrix {
        let (s, c) = rad.sin_cos();
        Matrix([
              c, 0.0,  -s, 0.0,
            0.0, 1.0, 0.0, 0.0,
              s, 0.0,   c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    #[rustfmt::skip]
    pub fn rotation_z(rad: f64) -> Matrix {
        let (s, c) = rad.sin_cos();
        Matrix([
              c,   s, 0.0, 0.0,
             -s,   c, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Post-multiplies a rotation about X.
    pub fn rotate_x(&mut self, rad: f64) -> &mut Self {
        *self = self.multiply(&Self::rotation_x(rad));
        self
    }

    pub fn rotate_y(&mut self, rad: f64) -> &mut Self {
        *self = self.multiply(&Self::rotation_y(rad));
        self
    }

    pub fn rotate_z(&mut self, rad: f64) -> &mut Self {
        *self = self.multiply(&Self::rotation_z(rad));
        self
    }

    pub fn translate(&mut self, x: f64, y: f64, z: f64) -> &mut Self {
        let mut t = Self::IDENTITY;
        t.0[12] = x;
        t.0[13] = y;
        t.0[14] = z;
        *self = self.multiply(&t);
        self
    }

    /// OpenGL-style orthographic projection into [-1, 1] clip space.
    pub fn orthographic(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Matrix {
        let mut m = Self::IDENTITY;
        m.0[0] = 2.0 / (right - left);
        m.0[5] = 2.0 / (top - bottom);
        m.0[10] = -2.0 / (far - near);
        m.0[12] = -(right + left) / (right - left);
        m.0[13] = -(top + bottom) / (top - bottom);
        m.0[14] = -(far + near) / (far - near);
        m
    }

    /// Transforms a point (w = 1); the result is not divided by w.
    pub fn transform(&self, v: Vector3) -> Vector3 {
        let m = &self.0;
        Vector3::new(
            m[0] * v.x + m[4] * v.y + m[8] * v.z + m[12],
            m[1] * v.x + m[5] * v.y + m[9] * v.z + m[13],
            m[2] * v.x + m[6] * v.y + m[10] * v.z + m[14],
        )
    }

    pub fn to_f32(&self) -> [f32; 16] {
        self.0.map(|v| v as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_close(a: Vector3, b: Vector3) {
        assert!(a.distance(b) < 1e-12, "expected {a:?} ~= {b:?}");
    }

    #[test]
    fn identity_is_neutral() {
        let r = Matrix::rotation_y(0.3);
        assert_eq!(Matrix::IDENTITY.multiply(&r), r);
        assert_eq!(r.multiply(&Matrix::IDENTITY), r);
    }

    #[test]
    fn axis_rotations_follow_right_hand_rule() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        let z = Vector3::new(0.0, 0.0, 1.0);
        assert_vec_close(Matrix::rotation_x(FRAC_PI_2).transform(y), z);
        assert_vec_close(Matrix::rotation_y(FRAC_PI_2).transform(z), x);
        assert_vec_close(Matrix::rotation_z(FRAC_PI_2).transform(x), y);
    }

    #[test]
    fn chained_operations_apply_right_to_left() {
        let mut m = Matrix::IDENTITY;
        m.translate(1.0, 0.0, 0.0).rotate_z(FRAC_PI_2);
        // Rotation first, then the translation.
        assert_vec_close(m.transform(Vector3::new(1.0, 0.0, 0.0)), Vector3::new(1.0, 1.0, 0.0));
        m.reset();
        assert_eq!(m, Matrix::IDENTITY);
    }

    #[test]
    fn orthographic_maps_box_to_clip_cube() {
        let p = Matrix::orthographic(-2.0, 2.0, -1.0, 1.0, -10.0, 10.0);
        assert_vec_close(p.transform(Vector3::new(2.0, 1.0, 0.0)), Vector3::new(1.0, 1.0, 0.0));
        assert_vec_close(p.transform(Vector3::new(-2.0, -1.0, 10.0)), Vector3::new(-1.0, -1.0, -1.0));
    }
}
