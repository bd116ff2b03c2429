//! Audio-reactive smoke-wave visualizer.
//!
//! A flat lattice mesh is displaced on the GPU by a displacement map that a
//! live audio monitor keeps feeding: each frame the loudness of the playing
//! track is stamped into a sliding ping-pong buffer, so sound ripples travel
//! across the surface over time. Smoke-like particles and a tinted
//! background fill out the scene; an egui panel exposes the knobs.

pub mod audio;
pub mod camera;
pub mod cli;
pub mod mesh;
pub mod params;
pub mod particles;
pub mod rendering;
pub mod ui;
