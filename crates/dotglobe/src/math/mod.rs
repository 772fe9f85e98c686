//! Geometry primitives shared by every layer of the globe: colors, vectors,
//! a column-major 4×4 matrix, geodetic locations and screen bounds.

pub mod bounds;
pub mod color;
pub mod location;
pub mod matrix;
pub mod vector;

pub use bounds::Bounds;
pub use color::Color;
pub use location::{shortest_delta, wrap_lng, Location, EARTH_RADIUS_KM};
pub use matrix::Matrix;
pub use vector::{Vector2, Vector3};
