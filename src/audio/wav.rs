//! WAV file output for headless environments

use crate::audio::{AudioBuffer, AudioSink};
use crate::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Writes every reading to `<dir>/reading-<n>.wav` as 16-bit PCM
#[derive(Debug)]
pub struct WavFileSink {
    dir: PathBuf,
    counter: AtomicU64,
}

impl WavFileSink {
    /// Create a sink writing into `dir` (created if missing)
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::Audio(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.dir.join(format!("reading-{}.wav", n))
    }
}

/// Write `buffer` to `path` as 16-bit PCM
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<(), AppError> {
    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| AppError::Audio("too many channels".to_string()))?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let audio_err = |e: hound::Error| AppError::Audio(format!("{}: {}", path.display(), e));
    let mut writer = hound::WavWriter::create(path, spec).map_err(audio_err)?;
    for sample in buffer.interleaved() {
        let value = (sample * 32768.0).clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
        writer.write_sample(value).map_err(audio_err)?;
    }
    writer.finalize().map_err(audio_err)
}

impl AudioSink for WavFileSink {
    fn play(&self, buffer: AudioBuffer) -> Result<(), AppError> {
        let path = self.next_path();
        write_wav(&path, &buffer)?;
        info!(
            path = %path.display(),
            duration_ms = buffer.duration().as_millis(),
            "Recipe reading written"
        );
        Ok(())
    }
}
