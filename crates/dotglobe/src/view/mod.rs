//! Camera, projection and the surfaces scene content is drawn on.
//!
//! The camera is orthographic and always centred on the unit sphere, so a
//! camera-space `z` sign alone says which hemisphere something is on.

pub mod compositor;
pub mod surface;

pub use compositor::{Compositor, Layered};
pub use surface::{DrawCommand, DrawList, Font, FontFamily, Surface2d, TextAlign};

use crate::config::options::Quality;
use crate::math::{Location, Matrix, Vector2, Vector3};
use crate::renderer::hemisphere_weight;

/// Neither surface dimension may exceed this many texels.
pub const MAX_SURFACE_SIDE: u32 = 4096;

const NEAR: f64 = -10.0;
const FAR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: Location,
    /// Zoom factor; 1 fits the globe to the shorter side.
    pub scale: f64,
    /// Axial tilt in degrees.
    pub tilt: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: Location::default(),
            scale: 1.0,
            tilt: 0.0,
        }
    }
}

/// Where a model-space point lands this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub camera: Vector3,
    /// CSS pixels, origin top-left.
    pub screen: Vector2,
}

impl Projected {
    /// Cosine between the point and the view direction.
    pub fn facing(&self) -> f64 {
        let len = self.camera.length();
        if len > 0.0 {
            self.camera.z / len
        } else {
            1.0
        }
    }

    pub fn is_front(&self) -> bool {
        self.camera.z >= 0.0
    }

    /// Behind the globe and inside its silhouette.
    pub fn is_occluded(&self) -> bool {
        self.camera.z < 0.0 && self.camera.x * self.camera.x + self.camera.y * self.camera.y < 1.0
    }
}

#[derive(Debug, Clone)]
pub struct View {
    width: f64,
    height: f64,
    pixel_ratio: f64,
    surface: [u32; 2],
    camera: Camera,
    model_view: Matrix,
    projection: Matrix,
}

impl View {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64, quality: Quality) -> Self {
        let mut view = Self {
            width: 0.0,
            height: 0.0,
            pixel_ratio: 1.0,
            surface: [1, 1],
            camera: Camera::default(),
            model_view: Matrix::IDENTITY,
            projection: Matrix::IDENTITY,
        };
        view.resize(width, height, device_pixel_ratio, quality);
        view
    }

    /// Sets the CSS size and recomputes the surface size: the device pixel
    /// ratio is capped by the quality tier, then scaled down uniformly until
    /// both sides fit `MAX_SURFACE_SIDE`.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64, quality: Quality) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);

        let mut ratio = device_pixel_ratio.max(0.1).min(quality.max_pixel_ratio());
        let longest = self.width.max(self.height) * ratio;
        if longest > MAX_SURFACE_SIDE as f64 {
            ratio *= MAX_SURFACE_SIDE as f64 / longest;
        }
        self.pixel_ratio = ratio;
        self.surface = [
            ((self.width * ratio).round() as u32).clamp(1, MAX_SURFACE_SIDE),
            ((self.height * ratio).round() as u32).clamp(1, MAX_SURFACE_SIDE),
        ];
        self.rebuild();
    }

    pub fn set_camera(&mut self, camera: Camera) {
        if self.camera != camera {
            self.camera = camera;
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        let c = &self.camera;
        let mut mv = Matrix::IDENTITY;
        mv.rotate_z(c.tilt.to_radians())
            .rotate_x(c.center.lat.to_radians())
            .rotate_y(-c.center.lng.to_radians());
        self.model_view = mv;

        let r = self.radius_px();
        let (hw, hh) = (self.width / (2.0 * r), self.height / (2.0 * r));
        self.projection = Matrix::orthographic(-hw, hw, -hh, hh, NEAR, FAR);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn size(&self) -> Vector2 {
        Vector2::new(self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn surface_size(&self) -> [u32; 2] {
        self.surface
    }

    /// Globe radius in CSS pixels.
    pub fn radius_px(&self) -> f64 {
        self.width.min(self.height) / 2.0 * self.camera.scale
    }

    pub fn center_px(&self) -> Vector2 {
        Vector2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn model_view(&self) -> &Matrix {
        &self.model_view
    }

    pub fn projection(&self) -> &Matrix {
        &self.projection
    }

    pub fn project_vector(&self, model: Vector3) -> Projected {
        project_with(&self.model_view, self.center_px(), self.radius_px(), model)
    }

    pub fn project(&self, location: &Location, relief: f64) -> Projected {
        self.project_vector(Vector3::from_location(location, relief))
    }

    /// A closure over this frame's transform, for bulk projection.
    pub fn projector(&self) -> impl Fn(Vector3) -> (Vector3, Vector2) + Sync {
        let (mv, center, r) = (self.model_view, self.center_px(), self.radius_px());
        move |v| {
            let p = project_with(&mv, center, r, v);
            (p.camera, p.screen)
        }
    }

    /// The front-hemisphere surface location under `screen`, if any.
    pub fn unproject(&self, screen: Vector2) -> Option<Location> {
        let r = self.radius_px();
        let c = self.center_px();
        let x = (screen.x - c.x) / r;
        let y = (c.y - screen.y) / r;
        let d2 = x * x + y * y;
        if d2.is_nan() || d2 > 1.0 {
            return None;
        }
        let cam = Vector3::new(x, y, (1.0 - d2).sqrt());

        // Pure rotation: the inverse is the transpose.
        let m = &self.model_view.0;
        let model = Vector3::new(
            m[0] * cam.x + m[1] * cam.y + m[2] * cam.z,
            m[4] * cam.x + m[5] * cam.y + m[6] * cam.z,
            m[8] * cam.x + m[9] * cam.y + m[10] * cam.z,
        );
        Some(Location::from_vector(model))
    }

    /// Front and back surface weights for content facing `facing`.
    ///
    /// The two are complementary across the transition band, and the back
    /// weight is further scaled by `backside_opacity`.
    pub fn hemisphere_alphas(facing: f64, transition: f64, backside_opacity: f64) -> (f64, f64) {
        let front = hemisphere_weight(facing, transition);
        (front, (1.0 - front) * backside_opacity)
    }
}

fn project_with(mv: &Matrix, center: Vector2, radius: f64, model: Vector3) -> Projected {
    let camera = mv.transform(model);
    Projected {
        camera,
        screen: Vector2::new(center.x + camera.x * radius, center.y - camera.y * radius),
    }
}
