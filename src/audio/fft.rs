//! FFT analysis thread.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::AudioBands;
use crate::params::FftConfig;

/// Spawn the analysis thread. It drains the sample tap filled by the audio
/// callback, runs a Hann-windowed FFT with 50% overlap, and publishes band
/// energies.
pub fn spawn_fft_thread(
    config: FftConfig,
    tap: Arc<Mutex<Vec<f32>>>,
    bands: Arc<Mutex<AudioBands>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let mut window = vec![0.0f32; config.fft_size];
        let mut scratch = vec![Complex::new(0.0, 0.0); config.fft_size];

        loop {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            // Copy the newest window out under the lock; the transform runs
            // unlocked so the realtime callback never waits on it.
            {
                let mut samples = tap.lock().unwrap();
                if samples.len() < config.fft_size {
                    continue;
                }

                // The callback produces faster than one window per interval;
                // anything older than the newest window is stale and would
                // let the tap grow without bound.
                let excess = samples.len() - config.fft_size;
                if excess > 0 {
                    samples.drain(0..excess);
                }

                window.copy_from_slice(&samples);

                // 50% overlap between analysis windows.
                samples.drain(0..config.fft_size / 2);
            }

            for (i, slot) in scratch.iter_mut().enumerate() {
                *slot = Complex::new(window[i] * hann_window(i, config.fft_size), 0.0);
            }
            fft.process(&mut scratch);

            let band_energy = |range: std::ops::Range<usize>| -> f32 {
                if range.is_empty() {
                    return 0.0;
                }
                let len = range.len() as f32;
                scratch[range].iter().map(|c| c.norm()).sum::<f32>() / len
            };

            *bands.lock().unwrap() = AudioBands {
                low: band_energy(config.bass_bins()),
                mid: band_energy(config.mid_bins()),
                high: band_energy(config.high_bins()),
            };
        }
    })
}

/// Hann window for FFT analysis.
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let size = 1024;
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_tap_backlog_stays_bounded() {
        let fft_size = 1024;
        let config = FftConfig {
            sample_rate_hz: 48_000,
            fft_size,
            update_interval_ms: 1,
            ..FftConfig::default()
        };

        let tap = Arc::new(Mutex::new(Vec::new()));
        let bands = Arc::new(Mutex::new(AudioBands::default()));
        let _handle = spawn_fft_thread(config, Arc::clone(&tap), Arc::clone(&bands));

        // Feed samples faster than a half-window drain per interval could
        // ever consume, the way a 48 kHz callback does.
        for _ in 0..100 {
            {
                let mut samples = tap.lock().unwrap();
                for n in 0..480 {
                    samples.push((n as f32 * 0.01).sin());
                }
            }
            thread::sleep(Duration::from_millis(2));
        }

        let backlog = tap.lock().unwrap().len();
        assert!(
            backlog < 4 * fft_size,
            "tap backlog grew to {} samples",
            backlog
        );
    }

    #[test]
    fn test_fft_thread_publishes_sine_energy() {
        let config = FftConfig {
            sample_rate_hz: 44_100,
            fft_size: 1024,
            update_interval_ms: 1,
            ..FftConfig::default()
        };

        // 100 Hz sine lands in the bass band.
        let samples: Vec<f32> = (0..2048)
            .map(|n| (2.0 * PI * 100.0 * n as f32 / 44_100.0).sin())
            .collect();

        let tap = Arc::new(Mutex::new(samples));
        let bands = Arc::new(Mutex::new(AudioBands::default()));
        let _handle = spawn_fft_thread(config, Arc::clone(&tap), Arc::clone(&bands));

        // Wait for at least one analysis pass.
        for _ in 0..100 {
            thread::sleep(Duration::from_millis(5));
            let b = *bands.lock().unwrap();
            if b.low > 0.0 {
                assert!(b.low > b.high, "bass {} should exceed highs {}", b.low, b.high);
                return;
            }
        }
        panic!("analysis thread never published bands");
    }
}
