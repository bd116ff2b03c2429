//! Audio graph parameters and analysis configuration.

use std::ops::Range;

/// Live audio graph parameters, pushed into the callback once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioParams {
    /// Gain applied right after the player.
    pub gain: f32,

    /// Band-pass filter center frequency (Hz), monitor path only.
    pub filter_center_hz: f32,

    /// Band-pass filter quality factor.
    pub filter_q: f32,

    /// Delay applied to the output path (seconds).
    pub delay_s: f32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            filter_center_hz: 10_000.0,
            filter_q: 100.0,
            delay_s: 0.015,
        }
    }
}

/// FFT analysis configuration with frequency band mappings.
#[derive(Debug, Clone)]
pub struct FftConfig {
    /// Audio sample rate (Hz). Overwritten with the device rate at startup.
    pub sample_rate_hz: usize,

    /// FFT window size (must be a power of 2).
    pub fft_size: usize,

    /// Analysis interval (milliseconds).
    pub update_interval_ms: u64,

    /// Bass frequency range (Hz).
    pub bass_range_hz: (f32, f32),

    /// Mid frequency range (Hz).
    pub mid_range_hz: (f32, f32),

    /// High frequency range (Hz).
    pub high_range_hz: (f32, f32),
}

impl Default for FftConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            fft_size: 2048,
            update_interval_ms: 50,
            bass_range_hz: (20.0, 200.0),
            mid_range_hz: (200.0, 1000.0),
            high_range_hz: (1000.0, 4000.0),
        }
    }
}

impl FftConfig {
    /// Convert frequency (Hz) to FFT bin index.
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// FFT bin range for bass frequencies.
    pub fn bass_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.bass_range_hz.0)..self.hz_to_bin(self.bass_range_hz.1)
    }

    /// FFT bin range for mid frequencies.
    pub fn mid_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.mid_range_hz.0)..self.hz_to_bin(self.mid_range_hz.1)
    }

    /// FFT bin range for high frequencies.
    pub fn high_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.high_range_hz.0)..self.hz_to_bin(self.high_range_hz.1)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.sample_rate_hz == 0 {
            return Err("Sample rate must be > 0".to_string());
        }
        Ok(())
    }
}

/// Compile-time audio constants.
pub mod audio_constants {
    /// RMS window of the volume monitor (samples).
    pub const MONITOR_WINDOW: usize = 1024;

    /// Longest delay the output delay line can hold (seconds).
    pub const MAX_DELAY_S: f32 = 2.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_to_bin_mapping() {
        let config = FftConfig {
            sample_rate_hz: 44_100,
            fft_size: 1024,
            ..FftConfig::default()
        };

        // Bin resolution = 44100 / 1024 ≈ 43.07 Hz per bin
        assert_eq!(config.hz_to_bin(0.0), 0);
        assert_eq!(config.hz_to_bin(43.07), 1);
        assert_eq!(config.hz_to_bin(100.0), 2);
    }

    #[test]
    fn test_band_ranges_are_ordered() {
        let config = FftConfig::default();

        let bass = config.bass_bins();
        let mid = config.mid_bins();
        let high = config.high_bins();

        assert!(bass.end <= mid.start + 1);
        assert!(mid.end <= high.start + 1);
        assert!(high.end < config.fft_size / 2);
    }

    #[test]
    fn test_validate_rejects_bad_fft_size() {
        let config = FftConfig {
            fft_size: 1000,
            ..FftConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(FftConfig::default().validate().is_ok());
    }
}
