//! Gemini configuration
//!
//! Models, sampling and deadline settings for every backend call.

use crate::error::AppError;
use crate::gemini::constants::GEMINI_API_BASE_URL;
use serde::{Deserialize, Serialize};

/// Gemini configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiConfig {
    /// Gemini API base URL
    pub api_base_url: String,
    /// Model used for conversational turns
    pub chat_model: String,
    /// Model used for dish visualizations
    pub image_model: String,
    /// Model used for speech synthesis
    pub speech_model: String,
    /// Prebuilt voice used for speech synthesis
    pub voice_name: String,
    /// Sampling temperature for conversation sessions
    pub temperature: f32,
    /// Deadline for one-shot calls in seconds
    pub request_timeout_secs: u64,
    /// Maximum silence between two streamed chunks in seconds
    pub stream_idle_timeout_secs: u64,
    /// Speech input is truncated to this many characters
    pub speech_char_limit: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: GEMINI_API_BASE_URL.to_string(),
            chat_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice_name: "Kore".to_string(),
            temperature: 0.7,
            request_timeout_secs: 60,
            stream_idle_timeout_secs: 60,
            speech_char_limit: 500,
        }
    }
}

/// Optional overrides for [`GeminiConfig`]
#[derive(Debug, Default, Deserialize)]
pub struct GeminiConfigUpdate {
    /// Gemini API base URL (optional)
    pub api_base_url: Option<String>,
    /// Chat model name (optional)
    pub chat_model: Option<String>,
    /// Image model name (optional)
    pub image_model: Option<String>,
    /// Speech model name (optional)
    pub speech_model: Option<String>,
    /// Voice name (optional)
    pub voice_name: Option<String>,
    /// Sampling temperature (optional)
    pub temperature: Option<f32>,
    /// One-shot deadline in seconds (optional)
    pub request_timeout_secs: Option<u64>,
    /// Stream idle deadline in seconds (optional)
    pub stream_idle_timeout_secs: Option<u64>,
}

fn non_empty(field: &str, value: String) -> Result<String, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidConfig(format!("{} cannot be empty", field)));
    }
    Ok(value)
}

fn non_zero(field: &str, value: u64) -> Result<u64, AppError> {
    if value == 0 {
        return Err(AppError::InvalidConfig(format!("{} must be > 0", field)));
    }
    Ok(value)
}

/// Validate and apply configuration updates
///
/// Returns an error if any validation fails; in that case nothing is applied.
///
/// # Arguments
/// * `config` - The current config to update
/// * `request` - The update request with optional fields
///
/// # Returns
/// * `Ok(GeminiConfig)` - The updated configuration
/// * `Err(AppError)` - If validation fails
pub fn validate_and_apply_config_update(
    mut config: GeminiConfig,
    request: GeminiConfigUpdate,
) -> Result<GeminiConfig, AppError> {
    if let Some(url) = request.api_base_url {
        config.api_base_url = non_empty("api_base_url", url)?
            .trim_end_matches('/')
            .to_string();
    }
    if let Some(model) = request.chat_model {
        config.chat_model = non_empty("chat_model", model)?;
    }
    if let Some(model) = request.image_model {
        config.image_model = non_empty("image_model", model)?;
    }
    if let Some(model) = request.speech_model {
        config.speech_model = non_empty("speech_model", model)?;
    }
    if let Some(voice) = request.voice_name {
        config.voice_name = non_empty("voice_name", voice)?;
    }
    if let Some(temperature) = request.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::InvalidConfig(format!(
                "temperature must be within 0.0..=2.0, got {}",
                temperature
            )));
        }
        config.temperature = temperature;
    }
    if let Some(timeout) = request.request_timeout_secs {
        config.request_timeout_secs = non_zero("request_timeout_secs", timeout)?;
    }
    if let Some(timeout) = request.stream_idle_timeout_secs {
        config.stream_idle_timeout_secs = non_zero("stream_idle_timeout_secs", timeout)?;
    }

    Ok(config)
}
