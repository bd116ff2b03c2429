//! DSP nodes run inside the audio callback.
//!
//! Each node processes one sample (or one stereo frame) at a time; the
//! callback wires them into the output and monitor paths.

use std::f32::consts::PI;

use super::decoder::AudioClip;

/// Looping clip player with linear-interpolation resampling to the
/// device rate.
pub struct Player {
    clip: AudioClip,
    /// Source frames advanced per output frame.
    step: f64,
    cursor: f64,
}

impl Player {
    pub fn new(clip: AudioClip, output_rate: u32) -> Self {
        let step = clip.sample_rate as f64 / output_rate.max(1) as f64;
        Self {
            clip,
            step,
            cursor: 0.0,
        }
    }

    /// Produce the next stereo frame, looping at the clip end.
    pub fn next_frame(&mut self) -> (f32, f32) {
        let frames = self.clip.num_frames();
        if frames == 0 {
            return (0.0, 0.0);
        }

        let i0 = self.cursor as usize;
        let i1 = (i0 + 1) % frames;
        let frac = (self.cursor - i0 as f64) as f32;

        let (l0, r0) = self.clip.stereo_frame(i0);
        let (l1, r1) = self.clip.stereo_frame(i1);
        let left = l0 + (l1 - l0) * frac;
        let right = r0 + (r1 - r0) * frac;

        self.cursor += self.step;
        if self.cursor >= frames as f64 {
            self.cursor -= frames as f64;
        }

        (left, right)
    }
}

/// Plain gain stage.
#[derive(Debug, Clone, Copy)]
pub struct Gain {
    pub level: f32,
}

impl Gain {
    pub fn new(level: f32) -> Self {
        Self { level }
    }

    #[inline]
    pub fn process(&self, x: f32) -> f32 {
        x * self.level
    }
}

/// Fixed-capacity delay line. The delay length is settable at runtime
/// up to the capacity chosen at construction.
pub struct DelayLine {
    buffer: Vec<f32>,
    write: usize,
    delay: usize,
}

impl DelayLine {
    pub fn new(max_delay_s: f32, sample_rate: u32) -> Self {
        let capacity = (max_delay_s * sample_rate as f32).ceil() as usize + 1;
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write: 0,
            delay: 0,
        }
    }

    pub fn set_delay(&mut self, seconds: f32, sample_rate: u32) {
        let samples = (seconds.max(0.0) * sample_rate as f32).round() as usize;
        self.delay = samples.min(self.buffer.len() - 1);
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let len = self.buffer.len();
        self.buffer[self.write] = x;
        let out = self.buffer[(self.write + len - self.delay) % len];
        self.write = (self.write + 1) % len;
        out
    }
}

/// RBJ band-pass biquad (constant 0 dB peak gain).
pub struct BandPass {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BandPass {
    pub fn new(center_hz: f32, q: f32, sample_rate: u32) -> Self {
        let mut filter = Self {
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        filter.set(center_hz, q, sample_rate);
        filter
    }

    /// Recompute coefficients. Center frequency is clamped below Nyquist.
    pub fn set(&mut self, center_hz: f32, q: f32, sample_rate: u32) {
        let fs = sample_rate.max(1) as f32;
        let center = center_hz.clamp(1.0, fs * 0.49);
        let q = q.max(0.001);

        let omega = 2.0 * PI * center / fs;
        let alpha = omega.sin() / (2.0 * q);
        let cos_omega = omega.cos();
        let a0 = 1.0 + alpha;

        self.b0 = alpha / a0;
        self.b1 = 0.0;
        self.b2 = -alpha / a0;
        self.a1 = -2.0 * cos_omega / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Sliding-window RMS volume monitor.
pub struct RmsMonitor {
    squares: Vec<f32>,
    idx: usize,
    sum: f64,
}

impl RmsMonitor {
    pub fn new(window: usize) -> Self {
        Self {
            squares: vec![0.0; window.max(1)],
            idx: 0,
            sum: 0.0,
        }
    }

    #[inline]
    pub fn push(&mut self, x: f32) {
        let sq = x * x;
        self.sum += (sq - self.squares[self.idx]) as f64;
        self.squares[self.idx] = sq;
        self.idx = (self.idx + 1) % self.squares.len();
    }

    pub fn volume(&self) -> f32 {
        ((self.sum / self.squares.len() as f64).max(0.0)).sqrt() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_clip(frames: usize, rate: u32) -> AudioClip {
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let v = i as f32 / frames as f32;
            samples.push(v);
            samples.push(-v);
        }
        AudioClip {
            samples,
            sample_rate: rate,
            channels: 2,
        }
    }

    #[test]
    fn test_player_loops() {
        let mut player = Player::new(test_clip(4, 48_000), 48_000);
        let first: Vec<_> = (0..4).map(|_| player.next_frame()).collect();
        let second: Vec<_> = (0..4).map(|_| player.next_frame()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_player_resamples_rate_ratio() {
        // Source at half the device rate advances half a frame per output frame.
        let mut player = Player::new(test_clip(100, 24_000), 48_000);
        let (a, _) = player.next_frame();
        let (b, _) = player.next_frame();
        let (c, _) = player.next_frame();
        assert_eq!(a, 0.0);
        assert!((b - 0.005).abs() < 1e-6); // halfway between frames 0 and 1
        assert!((c - 0.01).abs() < 1e-6); // exactly frame 1
    }

    #[test]
    fn test_player_empty_clip_is_silent() {
        let clip = AudioClip {
            samples: vec![],
            sample_rate: 44_100,
            channels: 2,
        };
        let mut player = Player::new(clip, 48_000);
        assert_eq!(player.next_frame(), (0.0, 0.0));
    }

    #[test]
    fn test_gain() {
        let gain = Gain::new(0.5);
        assert_eq!(gain.process(0.8), 0.4);
    }

    #[test]
    fn test_delay_line_impulse() {
        let rate = 1000;
        let mut delay = DelayLine::new(1.0, rate);
        delay.set_delay(0.01, rate); // 10 samples

        let mut out = Vec::new();
        for i in 0..20 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            out.push(delay.process(x));
        }
        assert_eq!(out[9], 0.0);
        assert_eq!(out[10], 1.0);
        assert_eq!(out[11], 0.0);
    }

    #[test]
    fn test_delay_line_zero_delay_passes_through() {
        let mut delay = DelayLine::new(1.0, 1000);
        delay.set_delay(0.0, 1000);
        assert_eq!(delay.process(0.7), 0.7);
    }

    #[test]
    fn test_delay_clamped_to_capacity() {
        let rate = 1000;
        let mut delay = DelayLine::new(0.1, rate);
        delay.set_delay(10.0, rate); // way past capacity, must not panic
        delay.process(1.0);
    }

    #[test]
    fn test_band_pass_rejects_dc() {
        let mut filter = BandPass::new(1000.0, 5.0, 44_100);
        let mut y = 0.0;
        for _ in 0..10_000 {
            y = filter.process(1.0);
        }
        assert!(y.abs() < 0.01, "DC leak: {}", y);
    }

    #[test]
    fn test_band_pass_passes_center_frequency() {
        let fs = 44_100u32;
        let center = 1000.0;
        let mut filter = BandPass::new(center, 2.0, fs);

        // Let the filter settle, then compare output/input RMS.
        let mut in_sq = 0.0f64;
        let mut out_sq = 0.0f64;
        for n in 0..44_100 {
            let x = (2.0 * PI * center * n as f32 / fs as f32).sin();
            let y = filter.process(x);
            if n > 4410 {
                in_sq += (x * x) as f64;
                out_sq += (y * y) as f64;
            }
        }
        let ratio = (out_sq / in_sq).sqrt();
        assert!((ratio - 1.0).abs() < 0.05, "center-band gain: {}", ratio);
    }

    #[test]
    fn test_band_pass_attenuates_far_band() {
        let fs = 44_100u32;
        let mut filter = BandPass::new(1000.0, 10.0, fs);

        let mut in_sq = 0.0f64;
        let mut out_sq = 0.0f64;
        for n in 0..44_100 {
            let x = (2.0 * PI * 50.0 * n as f32 / fs as f32).sin();
            let y = filter.process(x);
            if n > 4410 {
                in_sq += (x * x) as f64;
                out_sq += (y * y) as f64;
            }
        }
        let ratio = (out_sq / in_sq).sqrt();
        assert!(ratio < 0.1, "far-band leak: {}", ratio);
    }

    #[test]
    fn test_rms_monitor_constant_signal() {
        let mut monitor = RmsMonitor::new(256);
        for _ in 0..512 {
            monitor.push(0.5);
        }
        assert!((monitor.volume() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_rms_monitor_silence() {
        let monitor = RmsMonitor::new(256);
        assert_eq!(monitor.volume(), 0.0);
    }
}
