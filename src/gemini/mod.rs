//! Gemini backend module
//!
//! HTTP client, wire types and configuration for the Gemini REST API.
//! Nothing outside the gateway calls into this module directly.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod sse;
pub mod types;

pub use client::{GeminiClient, ResponseStream};
pub use config::{GeminiConfig, GeminiConfigUpdate};
pub use error::GeminiError;
