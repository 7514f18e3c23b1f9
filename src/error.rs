//! Error types and error handling for the application
//!
//! This module defines the error taxonomy shared by the gateway, the
//! conversation controller and the audio layer. Backend failures are
//! caught at the gateway boundary or directly above it in the controller;
//! nothing here is ever surfaced further than a status reset and, for chat
//! turns, an apology message.

use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
#[derive(Error, Debug)]
pub enum AppError {
    /// A conversation session could not be created (missing credential or
    /// rejected by the provider). The controller is non-functional until a
    /// new session is created.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A chat turn failed while its reply was streaming
    #[error("Stream failure: {0}")]
    StreamFailure(String),

    /// Image or speech generation failed
    #[error("Generation failure: {0}")]
    GenerationFailure(String),

    /// An attached image exceeds the upload limit
    #[error("Image is too large ({size} bytes). Please select an image under {limit} bytes.")]
    AttachmentTooLarge {
        /// Size of the rejected upload in bytes
        size: usize,
        /// Maximum accepted size in bytes
        limit: usize,
    },

    /// Audio decoding or output failed
    #[error("Audio error: {0}")]
    Audio(String),

    /// A configuration value was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
