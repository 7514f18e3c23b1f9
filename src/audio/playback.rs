//! Audio playback to system speakers via cpal.

use crate::audio::{AudioBuffer, AudioSink};
use crate::error::AppError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Extra time allowed past the buffer length before playback is abandoned.
const DRAIN_MARGIN: Duration = Duration::from_secs(2);

/// Plays buffers on the default output device.
///
/// Each call to [`AudioSink::play`] spawns a thread that owns the stream until
/// the buffer has drained; the caller never waits for completion.
#[derive(Debug, Default)]
pub struct CpalPlayback;

impl CpalPlayback {
    /// Create a playback sink, checking that an output device exists.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available.
    pub fn new() -> Result<Self, AppError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| AppError::Audio("no default output device".into()))?;
        let device_name = device
            .description()
            .map(|d| d.name().to_owned())
            .unwrap_or_else(|_| "<unknown>".into());
        info!("using output device: {device_name}");
        Ok(Self)
    }
}

/// Longest a playback thread waits for its stream to drain.
fn playback_deadline(duration: Duration) -> Duration {
    duration.saturating_add(DRAIN_MARGIN)
}

/// Internal buffer for tracking playback progress.
struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}

fn play_blocking(buffer: AudioBuffer) -> Result<(), AppError> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AppError::Audio("no default output device".into()))?;

    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| AppError::Audio("too many channels".into()))?;
    let stream_config = StreamConfig {
        channels,
        sample_rate: buffer.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let deadline = Instant::now() + playback_deadline(buffer.duration());
    let state = Arc::new(Mutex::new(PlaybackBuffer {
        samples: buffer.interleaved(),
        position: 0,
        finished: false,
    }));
    let state_clone = Arc::clone(&state);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = match state_clone.lock() {
                    Ok(b) => b,
                    Err(_) => return,
                };
                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                        buf.finished = true;
                    }
                }
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AppError::Audio(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| AppError::Audio(format!("failed to start output stream: {e}")))?;

    // A device that stops pulling samples never sets `finished`.
    loop {
        std::thread::sleep(Duration::from_millis(10));
        let buf = state
            .lock()
            .map_err(|e| AppError::Audio(format!("playback buffer lock poisoned: {e}")))?;
        if buf.finished {
            break;
        }
        if Instant::now() >= deadline {
            warn!(
                played = buf.position,
                total = buf.samples.len(),
                "playback did not drain in time, stopping stream"
            );
            break;
        }
    }

    drop(stream);
    Ok(())
}

impl AudioSink for CpalPlayback {
    fn play(&self, buffer: AudioBuffer) -> Result<(), AppError> {
        debug!(
            frames = buffer.frame_count(),
            sample_rate = buffer.sample_rate(),
            "starting playback"
        );
        std::thread::Builder::new()
            .name("chef-mate-playback".into())
            .spawn(move || {
                if let Err(e) = play_blocking(buffer) {
                    error!("playback failed: {e}");
                }
            })
            .map_err(|e| AppError::Audio(format!("cannot spawn playback thread: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_deadline_covers_buffer_and_margin() {
        assert_eq!(playback_deadline(Duration::ZERO), DRAIN_MARGIN);
        assert_eq!(
            playback_deadline(Duration::from_millis(1500)),
            Duration::from_millis(3500)
        );
        assert_eq!(playback_deadline(Duration::MAX), Duration::MAX);
    }
}
