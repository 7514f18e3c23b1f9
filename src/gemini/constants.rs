//! Gemini constants
//!
//! Centralized constants used by the Gemini client and the gateway.

/// Default REST base URL
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Prefix of an SSE data line
pub const SSE_DATA_PREFIX: &str = "data:";

/// Modality requested for speech synthesis
pub const AUDIO_MODALITY: &str = "AUDIO";

/// Aspect ratio requested for dish visualizations
pub const SQUARE_ASPECT_RATIO: &str = "1:1";

/// Sample rate of synthesized speech (16-bit mono PCM)
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Channel count of synthesized speech
pub const SPEECH_CHANNELS: u16 = 1;
