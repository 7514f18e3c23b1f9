//! Audio decoding and output
//!
//! Synthesized speech arrives as raw signed 16-bit little-endian PCM,
//! interleaved by channel. [`decode_pcm16`] turns it into per-channel `f32`
//! samples in `[-1.0, 1.0)`; an [`AudioSink`] plays or stores the result.

#[cfg(feature = "playback")]
pub mod playback;
pub mod wav;

use crate::error::AppError;
use std::time::Duration;

#[cfg(feature = "playback")]
pub use playback::CpalPlayback;
pub use wav::WavFileSink;

/// Decoded, de-interleaved audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Playback length
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.sample_rate))
    }

    /// Samples re-interleaved frame by frame (device order)
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frame_count();
        let mut out = Vec::with_capacity(frames * self.channel_count());
        for frame in 0..frames {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }
}

/// Decode signed 16-bit little-endian interleaved PCM
///
/// A trailing partial frame is ignored.
///
/// # Errors
/// Returns `AppError::Audio` if `channel_count` or `sample_rate` is zero.
pub fn decode_pcm16(
    bytes: &[u8],
    sample_rate: u32,
    channel_count: u16,
) -> Result<AudioBuffer, AppError> {
    if channel_count == 0 {
        return Err(AppError::Audio("channel count must be > 0".to_string()));
    }
    if sample_rate == 0 {
        return Err(AppError::Audio("sample rate must be > 0".to_string()));
    }

    let channel_count = usize::from(channel_count);
    let frame_bytes = 2 * channel_count;
    let frames = bytes.len() / frame_bytes;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];

    for frame in bytes.chunks_exact(frame_bytes) {
        for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(2)) {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            channel.push(f32::from(value) / 32768.0);
        }
    }

    Ok(AudioBuffer {
        sample_rate,
        channels,
    })
}

/// Destination for decoded audio
///
/// `play` must return promptly; playback completes in the background.
pub trait AudioSink: Send + Sync {
    /// Start playing `buffer` without waiting for it to finish
    fn play(&self, buffer: AudioBuffer) -> Result<(), AppError>;
}
