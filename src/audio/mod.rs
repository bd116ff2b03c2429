//! Audio playback and analysis.
//!
//! A decoded clip is played through a small DSP graph inside the cpal
//! callback (player → gain → delay → output), with a monitor tap
//! (band-pass → RMS volume) and an FFT analysis thread publishing band
//! energies once per interval. The render thread only ever polls the
//! published snapshots.

mod decoder;
mod fft;
mod graph;
mod system;

pub use decoder::{load_clip, AudioClip, DecodeError};
pub use fft::{hann_window, spawn_fft_thread};
pub use graph::{BandPass, DelayLine, Gain, Player, RmsMonitor};
pub use system::{AudioError, AudioSystem};

/// Frequency band energies published by the analysis thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct AudioBands {
    pub low: f32,  // Bass (20-200 Hz)
    pub mid: f32,  // Mids (200-1000 Hz)
    pub high: f32, // Highs (1000-4000 Hz)
}
