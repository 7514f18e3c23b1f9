//! Chef Mate Library
//!
//! Cooking assistant core: Gemini client, AI gateway, conversation
//! controller and audio output. The terminal binary is in `src/main.rs`.

pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod gemini;
/// User preferences
pub mod state;
