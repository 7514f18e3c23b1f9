//! Chat module
//!
//! Conversation state and its orchestration: the message log, photo
//! attachments, controller events and the conversation controller.

pub mod attachment;
pub mod controller;
pub mod events;
pub mod heuristics;
pub mod log;
pub mod models;

pub use attachment::InlineImage;
pub use controller::ConversationController;
pub use events::ControllerEvent;
pub use log::MessageLog;
pub use models::{Message, MessageId, MessageRole, SessionStatus};
