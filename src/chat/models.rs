//! Chat data models
//!
//! Defines the transcript message, its role, and the UI-level session status.

use crate::chat::attachment::InlineImage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user
    User,
    /// Message from the assistant
    Assistant,
}

impl MessageRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Identifier of a message, increasing in arrival order within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single turn in the visible transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Unique identifier for the message
    pub id: MessageId,
    /// Role of the message sender
    pub role: MessageRole,
    /// Markdown text; mutable only while `pending`
    pub text: String,
    /// Attached photo or generated visualization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
    /// True while the reply is still streaming in
    pub pending: bool,
    /// When the message was created (Unix timestamp)
    pub created_at: i64,
}

impl Message {
    /// Create a finalized message
    pub fn new(id: MessageId, role: MessageRole, text: String, image: Option<InlineImage>) -> Self {
        Self {
            id,
            role,
            text,
            image,
            pending: false,
            created_at: Utc::now().timestamp(),
        }
    }

    /// Create an empty assistant message awaiting streamed text
    pub fn placeholder(id: MessageId) -> Self {
        Self {
            pending: true,
            ..Self::new(id, MessageRole::Assistant, String::new(), None)
        }
    }

    /// Whether the message came from the assistant
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// What the controller is currently waiting on
///
/// Every backend-contacting action requires `Idle`, so at most one backend
/// call is outstanding at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Ready for the next action
    #[default]
    Idle,
    /// A chat turn is streaming
    Sending,
    /// A dish visualization is being generated
    GeneratingImage,
    /// A recipe reading is being synthesized
    GeneratingAudio,
}

impl SessionStatus {
    /// Whether a new backend action may start
    pub fn is_idle(&self) -> bool {
        *self == SessionStatus::Idle
    }
}
