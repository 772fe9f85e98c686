//! GPU-facing data layouts and the CPU mirrors of shader math.

use crate::config::options::{AnimationMode, BlendMode};
use crate::config::GlobeSettings;
use crate::field::Point;
use crate::math::{Color, Matrix};
use glam::Mat4;

/// Maps OpenGL clip depth [-1, 1] to wgpu's [0, 1]; x and y are unchanged.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

/// Per-instance point data. Must match `VsIn` in `points.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl From<&Point> for PointVertex {
    fn from(p: &Point) -> Self {
        Self {
            position: p.position.to_f32(),
            uv: p.uv,
            color: p.color.to_f32(),
        }
    }
}

/// Frame uniforms. Must match `Uniforms` in `points.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointUniforms {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub backside_color: [f32; 4],
    /// Surface size in physical pixels.
    pub viewport: [f32; 2],
    /// Sprite diameter in CSS pixels.
    pub point_size: f32,
    pub pixel_ratio: f32,
    pub time: f32,
    pub animation_mode: u32,
    pub animation_speed: f32,
    pub animation_scale: f32,
    pub animation_intensity: f32,
    pub blend_mode: u32,
    pub has_texture: u32,
    pub backside_opacity: f32,
    pub backside_transition: f32,
    pub edge_fade: f32,
    pub _pad: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<PointUniforms>() == 208);

/// Per-point shading options, taken from the globe settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    pub point_size: f64,
    pub animation: AnimationMode,
    pub animation_speed: f64,
    pub animation_scale: f64,
    pub animation_intensity: f64,
    pub blend: BlendMode,
    pub has_texture: bool,
    pub backside_color: Color,
    pub backside_opacity: f64,
    pub backside_transition: f64,
    pub edge_fade: f64,
}

impl PointStyle {
    pub fn from_settings(s: &GlobeSettings, has_texture: bool) -> Self {
        Self {
            point_size: s.point_size,
            animation: s.animation,
            animation_speed: s.animation_speed,
            animation_scale: s.animation_scale,
            animation_intensity: s.animation_intensity,
            blend: s.point_blend,
            has_texture,
            backside_color: s.backside_color,
            backside_opacity: s.backside_opacity,
            backside_transition: s.backside_transition,
            edge_fade: s.edge_fade,
        }
    }
}

impl PointUniforms {
    pub fn new(
        model_view: &Matrix,
        projection: &Matrix,
        viewport: [u32; 2],
        pixel_ratio: f64,
        time: f64,
        style: &PointStyle,
    ) -> Self {
        let mv = Mat4::from_cols_array(&model_view.to_f32());
        let proj = OPENGL_TO_WGPU_MATRIX * Mat4::from_cols_array(&projection.to_f32());
        Self {
            model_view: mv.to_cols_array_2d(),
            projection: proj.to_cols_array_2d(),
            backside_color: style.backside_color.to_f32(),
            viewport: [viewport[0].max(1) as f32, viewport[1].max(1) as f32],
            point_size: style.point_size as f32,
            pixel_ratio: pixel_ratio as f32,
            // Wrapped so f32 precision holds over long sessions.
            time: (time % 3600.0) as f32,
            animation_mode: style.animation as u32,
            animation_speed: style.animation_speed as f32,
            animation_scale: style.animation_scale as f32,
            animation_intensity: style.animation_intensity as f32,
            blend_mode: style.blend as u32,
            has_texture: style.has_texture as u32,
            backside_opacity: style.backside_opacity as f32,
            backside_transition: style.backside_transition as f32,
            edge_fade: style.edge_fade as f32,
            _pad: [0.0; 2],
        }
    }
}

/// Front-surface weight of content whose camera-facing cosine is `z`.
///
/// 1 on the near hemisphere, 0 on the far one, smoothstepped across
/// `|z| < transition`. The shader's backside band uses the same curve.
pub fn hemisphere_weight(z: f64, transition: f64) -> f64 {
    if transition <= 0.0 {
        return if z >= 0.0 { 1.0 } else { 0.0 };
    }
    let x = ((z + transition) / (2.0 * transition)).clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// Approximate sRGB to linear conversion, matching `to_linear` in the shader.
pub fn color_to_linear(c: Color) -> [f64; 4] {
    let [r, g, b, a] = c.to_f32();
    let lin = |v: f32| (v as f64).powf(2.2);
    [lin(r), lin(g), lin(b), a as f64]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Location, Vector2, Vector3};

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<PointVertex>(), 36);
    }

    #[test]
    fn vertex_from_point() {
        let p = Point {
            index: 0,
            ring: 1,
            slice: 2,
            location: Location::new(0.0, 0.0),
            position: Vector3::new(0.0, 0.0, 1.0),
            uv: [0.5, 0.5],
            color: Color::WHITE,
            camera: Vector3::ZERO,
            screen: Vector2::ZERO,
        };
        let v = PointVertex::from(&p);
        assert_eq!(v.position, [0.0, 0.0, 1.0]);
        assert_eq!(v.color, [1.0; 4]);
    }

    #[test]
    fn hemisphere_band() {
        assert_eq!(hemisphere_weight(0.5, 0.1), 1.0);
        assert_eq!(hemisphere_weight(-0.5, 0.1), 0.0);
        assert!((hemisphere_weight(0.0, 0.1) - 0.5).abs() < 1e-12);
        assert_eq!(hemisphere_weight(0.0, 0.0), 1.0);
        assert_eq!(hemisphere_weight(-1e-9, 0.0), 0.0);
    }

    #[test]
    fn uniforms_remap_clip_depth() {
        let style = PointStyle::from_settings(&GlobeSettings::default(), false);
        let proj = Matrix::orthographic(-1.0, 1.0, -1.0, 1.0, -10.0, 10.0);
        let u = PointUniforms::new(&Matrix::IDENTITY, &proj, [800, 600], 2.0, 1.0, &style);
        let p = Mat4::from_cols_array_2d(&u.projection);
        let far = p.project_point3(glam::Vec3::new(0.0, 0.0, -10.0));
        let near = p.project_point3(glam::Vec3::new(0.0, 0.0, 10.0));
        assert!((far.z - 1.0).abs() < 1e-6 && near.z.abs() < 1e-6);
        assert_eq!(u.viewport, [800.0, 600.0]);
        assert_eq!(u.has_texture, 0);
    }
}
