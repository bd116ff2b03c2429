//! Audio clip decoding via Symphonia (WAV, MP3, FLAC, AAC).

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors raised while decoding a clip.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to open audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode audio: {0}")]
    Codec(#[from] SymphoniaError),

    #[error("no audio track found in file")]
    NoAudioTrack,

    #[error("audio track has no sample rate")]
    UnknownSampleRate,
}

/// A fully decoded clip: interleaved f32 samples in -1.0..1.0.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl AudioClip {
    /// Clip duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// One frame as a stereo pair. Mono clips duplicate the channel,
    /// wider layouts keep the first two.
    pub fn stereo_frame(&self, frame: usize) -> (f32, f32) {
        let base = frame * self.channels;
        let left = self.samples.get(base).copied().unwrap_or(0.0);
        let right = if self.channels > 1 {
            self.samples.get(base + 1).copied().unwrap_or(0.0)
        } else {
            left
        };
        (left, right)
    }
}

/// Decode an entire audio file into memory.
pub fn load_clip(path: &Path) -> Result<AudioClip, DecodeError> {
    let file = File::open(path)?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        stream,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt packets are skipped, not fatal.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    Ok(AudioClip {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip {
            samples: vec![0.0; 44_100 * 2],
            sample_rate: 44_100,
            channels: 2,
        };
        assert!((clip.duration() - 1.0).abs() < 0.001);
        assert_eq!(clip.num_frames(), 44_100);
    }

    #[test]
    fn test_stereo_frame_mono_duplicates() {
        let clip = AudioClip {
            samples: vec![0.25, -0.5],
            sample_rate: 44_100,
            channels: 1,
        };
        assert_eq!(clip.stereo_frame(0), (0.25, 0.25));
        assert_eq!(clip.stereo_frame(1), (-0.5, -0.5));
    }

    #[test]
    fn test_stereo_frame_out_of_range_is_silent() {
        let clip = AudioClip {
            samples: vec![0.1, 0.2],
            sample_rate: 44_100,
            channels: 2,
        };
        assert_eq!(clip.stereo_frame(5), (0.0, 0.0));
    }

    #[test]
    fn test_load_clip_missing_file() {
        let err = load_clip(Path::new("does/not/exist.mp3"));
        assert!(matches!(err, Err(DecodeError::Io(_))));
    }
}
