use crate::math::Color;
use image::{imageops::FilterType, DynamicImage, RgbaImage};

/// A color or opacity raster resampled to the heightmap grid, so points can
/// read it with the same `(row, col)` they read heights with.
#[derive(Debug, Clone)]
pub struct MapSampler {
    width: usize,
    height: usize,
    pixels: RgbaImage,
}

impl MapSampler {
    pub fn from_image(image: &DynamicImage, width: usize, height: usize) -> Self {
        let rgba = image.to_rgba8();
        Self::from_rgba(rgba, width, height)
    }

    pub fn from_rgba(rgba: RgbaImage, width: usize, height: usize) -> Self {
        let (w, h) = (width.max(1) as u32, height.max(1) as u32);
        let pixels = if rgba.dimensions() == (w, h) {
            rgba
        } else {
            image::imageops::resize(&rgba, w, h, FilterType::Triangle)
        };
        Self {
            width: w as usize,
            height: h as usize,
            pixels,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn color_at(&self, row: usize, col: usize) -> Color {
        let p = self.pixels.get_pixel(
            col.min(self.width - 1) as u32,
            row.min(self.height - 1) as u32,
        );
        Color::rgba(p[0], p[1], p[2], p[3])
    }

    /// Luminance times alpha, in [0, 1].
    pub fn opacity_at(&self, row: usize, col: usize) -> f64 {
        let c = self.color_at(row, col);
        let luma = (0.2126 * c.r as f64 + 0.7152 * c.g as f64 + 0.0722 * c.b as f64) / 255.0;
        luma * c.alpha_f64()
    }
}
