//! Procedural point field: latitude rings of longitude slices, filtered by
//! the heightmap and explicit add/remove lists, colored from optional maps.

pub mod sampler;

pub use sampler::MapSampler;

use crate::config::GlobeSettings;
use crate::math::{Color, Location, Vector2, Vector3};
use hgt::Heightmap;
use rayon::prelude::*;
use std::collections::HashSet;

/// Rings south of this latitude form the polar cap.
pub const POLAR_CAP_LATITUDE: f64 = -60.0;

/// One rendered surface dot.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub index: usize,
    pub ring: u32,
    pub slice: u32,
    /// Cell center; `offset` carries the sampled height.
    pub location: Location,
    /// Model-space position with relief applied.
    pub position: Vector3,
    pub uv: [f32; 2],
    pub color: Color,
    /// Camera-space position, refreshed every frame.
    pub camera: Vector3,
    /// Screen position in CSS pixels, refreshed every frame.
    pub screen: Vector2,
}

/// Everything a regeneration reads.
#[derive(Debug, Clone, Copy)]
pub struct FieldParams<'a> {
    pub density: f64,
    pub polar_cap: bool,
    pub equator: bool,
    pub add_points: &'a [Location],
    pub remove_points: &'a [Location],
    pub map_height: f64,
    pub color: Color,
    pub opacity: f64,
    pub color_map: Option<&'a MapSampler>,
    pub opacity_map: Option<&'a MapSampler>,
}

impl<'a> FieldParams<'a> {
    pub fn from_settings(
        settings: &'a GlobeSettings,
        color_map: Option<&'a MapSampler>,
        opacity_map: Option<&'a MapSampler>,
    ) -> Self {
        Self {
            density: settings.density,
            polar_cap: settings.polar_cap,
            equator: settings.equator,
            add_points: &settings.add_points,
            remove_points: &settings.remove_points,
            map_height: settings.map_height,
            color: settings.point_color,
            opacity: settings.point_opacity,
            color_map,
            opacity_map,
        }
    }
}

impl Default for FieldParams<'_> {
    fn default() -> Self {
        Self {
            density: 0.5,
            polar_cap: true,
            equator: false,
            add_points: &[],
            remove_points: &[],
            map_height: 0.05,
            color: Color::WHITE,
            opacity: 1.0,
            color_map: None,
            opacity_map: None,
        }
    }
}

pub fn ring_count(density: f64) -> u32 {
    (density.clamp(0.0, 1.0) * 118.0 + 40.0).round() as u32
}

pub fn ring_latitude(ring: u32, rings: u32) -> f64 {
    90.0 - (ring as f64 + 0.5) * 180.0 / rings as f64
}

/// Slices per ring, weighted toward the equator by an ease-out of a
/// triangular latitude profile.
pub fn slice_count(lat: f64, rings: u32) -> u32 {
    let tri = 1.0 - lat.abs() / 90.0;
    let e = 1.0 - (1.0 - tri).powi(2);
    ((2.0 * rings as f64 * e).round() as u32).max(3)
}

pub fn slice_longitude(slice: u32, slices: u32) -> f64 {
    -180.0 + slice as f64 * 360.0 / slices as f64
}

/// Nearest generated cell `(ring, slice)` for a location.
pub fn snap(location: &Location, rings: u32) -> (u32, u32) {
    let ring = (((90.0 - location.lat) * rings as f64 / 180.0).floor() as i64)
        .clamp(0, rings as i64 - 1) as u32;
    let slices = slice_count(ring_latitude(ring, rings), rings);
    let slice = (((location.lng + 180.0) * slices as f64 / 360.0).round() as i64)
        .rem_euclid(slices as i64) as u32;
    (ring, slice)
}

#[derive(Debug, Default)]
pub struct PointField {
    points: Vec<Point>,
    rings: u32,
    generation: u64,
}

impl PointField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds every point. Rings are generated in parallel and concatenated
    /// in ring order, so the result depends only on the inputs.
    pub fn generate(&mut self, heightmap: &Heightmap, params: &FieldParams) {
        let rings = ring_count(params.density);
        let added: HashSet<(u32, u32)> = params.add_points.iter().map(|l| snap(l, rings)).collect();
        let removed: HashSet<(u32, u32)> =
            params.remove_points.iter().map(|l| snap(l, rings)).collect();
        let equator_ring = rings / 2;

        let per_ring: Vec<Vec<Point>> = (0..rings)
            .into_par_iter()
            .map(|ring| {
                let lat = ring_latitude(ring, rings);
                if !params.polar_cap && lat < POLAR_CAP_LATITUDE {
                    return Vec::new();
                }
                let slices = slice_count(lat, rings);
                let mut out = Vec::with_capacity(slices as usize);
                for slice in 0..slices {
                    let cell = (ring, slice);
                    if removed.contains(&cell) {
                        continue;
                    }
                    let mut location = Location::new(lat, slice_longitude(slice, slices)).fixed();
                    let (u, v) = location.uv();
                    let (row, col) = heightmap.cell(u, v);
                    let forced = added.contains(&cell) || (params.equator && ring == equator_ring);
                    if !forced && !is_land(heightmap, row, col) {
                        continue;
                    }
                    location.offset = (heightmap.sample(u, v) as f64).max(0.0);
                    out.push(Point {
                        index: 0,
                        ring,
                        slice,
                        location,
                        position: Vector3::from_location(&location, params.map_height),
                        uv: [u as f32, v as f32],
                        color: point_color(params, row, col),
                        camera: Vector3::ZERO,
                        screen: Vector2::ZERO,
                    });
                }
                out
            })
            .collect();

        self.points = per_ring.into_iter().flatten().collect();
        for (i, p) in self.points.iter_mut().enumerate() {
            p.index = i;
        }
        self.rings = rings;
        self.generation += 1;

        log::debug!(
            "point field regenerated: {} rings, {} points (generation {})",
            rings,
            self.points.len(),
            self.generation
        );
    }

    /// Bumped by every regeneration.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rings(&self) -> u32 {
        self.rings
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.points.iter().map(|p| (p.ring, p.slice))
    }

    /// Recomputes camera-space and screen positions with `f`.
    pub fn project<F>(&mut self, f: F)
    where
        F: Fn(Vector3) -> (Vector3, Vector2) + Sync,
    {
        self.points.par_iter_mut().for_each(|p| {
            let (camera, screen) = f(p.position);
            p.camera = camera;
            p.screen = screen;
        });
    }

    /// Closest front-facing point within `tolerance` pixels of `screen`.
    pub fn nearest(&self, screen: Vector2, tolerance: f64) -> Option<&Point> {
        self.points
            .iter()
            .filter(|p| p.camera.z >= 0.0)
            .map(|p| (p.screen.distance(screen), p))
            .filter(|(d, _)| *d <= tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, p)| p)
    }
}

/// Land test on the grid cell under a point and its eight neighbours; a
/// single bilinear sample aliases past isolated land cells on dense rings.
fn is_land(heightmap: &Heightmap, row: usize, col: usize) -> bool {
    let (w, h) = (heightmap.width as i64, heightmap.height as i64);
    (-1..=1).any(|dr: i64| {
        let r = (row as i64 + dr).clamp(0, h - 1) as usize;
        (-1..=1).any(|dc: i64| {
            let c = (col as i64 + dc).rem_euclid(w) as usize;
            heightmap.get(r, c) > 0.0
        })
    })
}

fn point_color(params: &FieldParams, row: usize, col: usize) -> Color {
    let base = params.color_map.map_or(params.color, |m| m.color_at(row, col));
    let opacity = params.opacity * params.opacity_map.map_or(1.0, |m| m.opacity_at(row, col));
    base.with_alpha(opacity)
}
