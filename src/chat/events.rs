//! Controller events
//!
//! Broadcast to front ends so they can render streamed text and status
//! changes while an action is outstanding.

use crate::chat::models::{Message, MessageId, SessionStatus};
use serde::Serialize;
use uuid::Uuid;

/// Capacity of the event channel; slow receivers observe `Lagged`
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notifications emitted by the conversation controller
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ControllerEvent {
    /// A message was appended to the log
    #[serde(rename = "message_appended")]
    MessageAppended {
        /// The appended message
        message: Message,
    },
    /// A pending message changed
    #[serde(rename = "message_updated")]
    MessageUpdated {
        /// ID of the changed message
        id: MessageId,
        /// Full text after the change
        text: String,
        /// Whether more text may follow
        pending: bool,
    },
    /// The session status changed
    #[serde(rename = "status_changed")]
    StatusChanged {
        /// New status
        status: SessionStatus,
    },
    /// The conversation session was replaced (or lost)
    #[serde(rename = "session_reset")]
    SessionReset {
        /// ID of the new session, `None` if creation failed
        session_id: Option<Uuid>,
    },
}
