//! Gemini client error types
//!
//! Errors that can occur while talking to the Gemini REST API (transport,
//! HTTP status, decoding, safety blocks, deadlines).

use thiserror::Error;

/// Errors that can occur during a Gemini API call
#[derive(Error, Debug)]
pub enum GeminiError {
    /// No API key was configured
    #[error("API key is empty")]
    MissingApiKey,

    /// The HTTP request could not be sent or its body could not be read
    #[error("Failed to reach Gemini API: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Gemini API returned error status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },

    /// The API answered with HTTP 429
    #[error("Gemini API rate limit exceeded (HTTP 429): {body}")]
    RateLimited {
        /// Response body, as far as it could be read
        body: String,
    },

    /// The response body was not the expected JSON
    #[error("Failed to parse JSON response from Gemini API: {0}")]
    Parse(#[from] serde_json::Error),

    /// The prompt was blocked by the provider
    #[error("Gemini API blocked the prompt: {0}")]
    Blocked(String),

    /// No data arrived within the configured deadline
    #[error("Gemini API call timed out after {0} seconds")]
    Timeout(u64),
}
