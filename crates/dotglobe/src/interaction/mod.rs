//! Pointer handling, drag panning with inertia, and idle autorotation.

pub mod autorotate;
pub mod panning;
pub mod pointer;
pub mod speedometer;

pub use autorotate::{Autorotate, AutorotateParams};
pub use panning::Panning;
pub use pointer::{Pointer, PointerEvent};
pub use speedometer::Speedometer;
