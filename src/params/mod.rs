//! Parameter definitions with documented semantics.
//!
//! Every live-tunable value of the installation lives here, grouped the way
//! the debug panel presents them. Defaults reproduce the installation's
//! shipped look.

mod audio;
mod render;
mod visual;

pub use audio::{audio_constants, AudioParams, FftConfig};
pub use render::RenderConfig;
pub use visual::{
    ease_amplitude, BackgroundStyle, LineStyle, MovementParams, ParticleStyle, Toggles,
};

/// Aggregate of all live-tunable state, shared between the panel,
/// the keyboard handler, and the per-frame uniform updates.
#[derive(Debug, Clone, Default)]
pub struct AppParams {
    pub toggles: Toggles,
    pub movement: MovementParams,
    pub lines: LineStyle,
    pub background: BackgroundStyle,
    pub particles: ParticleStyle,
    pub audio: AudioParams,
}
