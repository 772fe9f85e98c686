// src/lib.rs
//! Interactive point-cloud globe.
//!
//! A sphere of surface dots generated from a heightmap, with markers, text
//! labels, arcs and host overlays, configured declaratively through element
//! attributes and style properties. `Globe` is the headless controller;
//! `app` hosts it in a winit window with a wgpu point layer and egui
//! surfaces.

pub mod app;
pub mod config;
pub mod events;
pub mod field;
pub mod globe;
pub mod interaction;
pub mod math;
pub mod objects;
pub mod renderer;
pub mod resources;
pub mod ui;
pub mod view;

pub use events::GlobeEvent;
pub use globe::Globe;
