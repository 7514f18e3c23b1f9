//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::gemini::config::validate_and_apply_config_update;
use crate::gemini::{GeminiConfig, GeminiConfigUpdate};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Where recipe readings go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutput {
    /// Play through the default output device
    Speaker,
    /// Write one WAV file per reading into this directory
    WavDir(PathBuf),
}

impl AudioOutput {
    fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("speaker") {
            AudioOutput::Speaker
        } else {
            AudioOutput::WavDir(PathBuf::from(value))
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Gemini API key (empty when unset)
    pub api_key: String,
    /// Gemini configuration
    pub gemini: GeminiConfig,
    /// Audio output for recipe readings
    pub audio_out: AudioOutput,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("gemini", &self.gemini)
            .field("audio_out", &self.audio_out)
            .finish()
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T>
where
    T::Err: fmt::Display,
{
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(var = name, value = %raw, error = %e, "Ignoring unparsable configuration value");
            None
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    ///
    /// Invalid overrides are logged and the default is kept.
    pub fn from_env() -> Self {
        let overrides = [
            (
                "GEMINI_API_BASE_URL",
                GeminiConfigUpdate {
                    api_base_url: env_string("GEMINI_API_BASE_URL"),
                    ..Default::default()
                },
            ),
            (
                "CHEF_MATE_CHAT_MODEL",
                GeminiConfigUpdate {
                    chat_model: env_string("CHEF_MATE_CHAT_MODEL"),
                    ..Default::default()
                },
            ),
            (
                "CHEF_MATE_IMAGE_MODEL",
                GeminiConfigUpdate {
                    image_model: env_string("CHEF_MATE_IMAGE_MODEL"),
                    ..Default::default()
                },
            ),
            (
                "CHEF_MATE_SPEECH_MODEL",
                GeminiConfigUpdate {
                    speech_model: env_string("CHEF_MATE_SPEECH_MODEL"),
                    ..Default::default()
                },
            ),
            (
                "CHEF_MATE_VOICE",
                GeminiConfigUpdate {
                    voice_name: env_string("CHEF_MATE_VOICE"),
                    ..Default::default()
                },
            ),
            (
                "CHEF_MATE_TEMPERATURE",
                GeminiConfigUpdate {
                    temperature: env_parsed("CHEF_MATE_TEMPERATURE"),
                    ..Default::default()
                },
            ),
            (
                "CHEF_MATE_REQUEST_TIMEOUT_SECS",
                GeminiConfigUpdate {
                    request_timeout_secs: env_parsed("CHEF_MATE_REQUEST_TIMEOUT_SECS"),
                    ..Default::default()
                },
            ),
            (
                "CHEF_MATE_STREAM_IDLE_TIMEOUT_SECS",
                GeminiConfigUpdate {
                    stream_idle_timeout_secs: env_parsed("CHEF_MATE_STREAM_IDLE_TIMEOUT_SECS"),
                    ..Default::default()
                },
            ),
        ];

        let mut gemini = GeminiConfig::default();
        for (var, update) in overrides {
            match validate_and_apply_config_update(gemini.clone(), update) {
                Ok(updated) => gemini = updated,
                Err(e) => warn!(var, error = %e, "Ignoring invalid configuration override"),
            }
        }

        Self {
            api_key: env_string("GEMINI_API_KEY")
                .map(|k| k.trim().to_string())
                .unwrap_or_default(),
            gemini,
            audio_out: env_string("CHEF_MATE_AUDIO_OUT")
                .map(|v| AudioOutput::parse(&v))
                .unwrap_or(AudioOutput::Speaker),
        }
    }
}
