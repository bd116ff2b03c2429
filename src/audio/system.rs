//! Audio system: cpal stream ownership and graph wiring.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::info;
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

use super::decoder::{AudioClip, DecodeError};
use super::fft::spawn_fft_thread;
use super::graph::{BandPass, DelayLine, Gain, Player, RmsMonitor};
use super::AudioBands;
use crate::params::{audio_constants, AudioParams, FftConfig};

/// Errors raised while setting up the audio system.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,

    #[error("failed to query audio device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),
}

/// Owns the output stream and the analysis thread; exposes per-frame
/// snapshot getters for the render thread.
pub struct AudioSystem {
    volume: Arc<Mutex<f32>>,
    bands: Arc<Mutex<AudioBands>>,
    params: Arc<Mutex<AudioParams>>,

    _stream: cpal::Stream,
    _fft_thread: thread::JoinHandle<()>,
}

impl AudioSystem {
    /// Wire the graph around a decoded clip and start playback.
    pub fn new(
        clip: AudioClip,
        mut fft_config: FftConfig,
        initial: AudioParams,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device.default_output_config()?;

        let sample_rate = config.sample_rate().0;
        let out_channels = config.channels() as usize;

        fft_config.sample_rate_hz = sample_rate as usize;
        fft_config
            .validate()
            .map_err(AudioError::InvalidConfig)?;

        info!(
            "audio: {} @ {}Hz, clip {:.1}s @ {}Hz",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            clip.duration(),
            clip.sample_rate
        );

        let volume = Arc::new(Mutex::new(0.0f32));
        let bands = Arc::new(Mutex::new(AudioBands::default()));
        let params = Arc::new(Mutex::new(initial));
        let tap = Arc::new(Mutex::new(Vec::<f32>::new()));

        // Graph nodes owned by the callback.
        let mut player = Player::new(clip, sample_rate);
        let mut gain = Gain::new(initial.gain);
        let mut delay_l = DelayLine::new(audio_constants::MAX_DELAY_S, sample_rate);
        let mut delay_r = DelayLine::new(audio_constants::MAX_DELAY_S, sample_rate);
        let mut filter = BandPass::new(initial.filter_center_hz, initial.filter_q, sample_rate);
        let mut monitor = RmsMonitor::new(audio_constants::MONITOR_WINDOW);
        let mut applied = initial;
        delay_l.set_delay(initial.delay_s, sample_rate);
        delay_r.set_delay(initial.delay_s, sample_rate);

        let volume_cb = Arc::clone(&volume);
        let params_cb = Arc::clone(&params);
        let tap_cb = Arc::clone(&tap);

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Fold in any parameter changes pushed since the last block.
                let wanted = *params_cb.lock().unwrap();
                if wanted != applied {
                    gain.level = wanted.gain;
                    if wanted.delay_s != applied.delay_s {
                        delay_l.set_delay(wanted.delay_s, sample_rate);
                        delay_r.set_delay(wanted.delay_s, sample_rate);
                    }
                    if wanted.filter_center_hz != applied.filter_center_hz
                        || wanted.filter_q != applied.filter_q
                    {
                        filter.set(wanted.filter_center_hz, wanted.filter_q, sample_rate);
                    }
                    applied = wanted;
                }

                let mut tap_buf = tap_cb.lock().unwrap();
                for frame in data.chunks_mut(out_channels) {
                    let (l, r) = player.next_frame();
                    let l = gain.process(l);
                    let r = gain.process(r);

                    // Monitor path: band-pass the mono mix, track RMS,
                    // feed the analysis tap.
                    let mono = 0.5 * (l + r);
                    monitor.push(filter.process(mono));
                    tap_buf.push(mono);

                    // Output path: delayed, hard-limited.
                    let out_l = delay_l.process(l).clamp(-1.0, 1.0);
                    let out_r = delay_r.process(r).clamp(-1.0, 1.0);

                    frame[0] = out_l;
                    if frame.len() > 1 {
                        frame[1] = out_r;
                    }
                    for extra in frame.iter_mut().skip(2) {
                        *extra = 0.0;
                    }
                }
                drop(tap_buf);

                *volume_cb.lock().unwrap() = monitor.volume();
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )?;
        stream.play()?;

        let fft_thread = spawn_fft_thread(fft_config, tap, Arc::clone(&bands));

        Ok(Self {
            volume,
            bands,
            params,
            _stream: stream,
            _fft_thread: fft_thread,
        })
    }

    /// Current monitor volume (RMS of the filtered mono mix).
    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }

    /// Latest published frequency bands.
    pub fn bands(&self) -> AudioBands {
        *self.bands.lock().unwrap()
    }

    /// Push live parameters; the callback applies them at its next block.
    pub fn apply_params(&self, params: &AudioParams) {
        *self.params.lock().unwrap() = *params;
    }
}
