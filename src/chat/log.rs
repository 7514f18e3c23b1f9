//! Append-only message log
//!
//! Messages are never removed during a session and keep arrival order.
//! Only pending assistant messages accept text updates.

use crate::chat::attachment::InlineImage;
use crate::chat::models::{Message, MessageId, MessageRole};

/// Ordered transcript of a conversation
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Append a finalized user message
    pub fn push_user(&mut self, text: String, image: Option<InlineImage>) -> &Message {
        let id = self.allocate_id();
        self.push(Message::new(id, MessageRole::User, text, image))
    }

    /// Append a finalized assistant message
    pub fn push_assistant(&mut self, text: String, image: Option<InlineImage>) -> &Message {
        let id = self.allocate_id();
        self.push(Message::new(id, MessageRole::Assistant, text, image))
    }

    /// Append an empty, pending assistant message
    pub fn push_placeholder(&mut self) -> &Message {
        let id = self.allocate_id();
        self.push(Message::placeholder(id))
    }

    /// Replace the text of a pending assistant message
    ///
    /// Returns false if the message is missing or already finalized.
    pub fn set_text(&mut self, id: MessageId, text: &str) -> bool {
        match self.get_mut(id) {
            Some(msg) if msg.pending => {
                msg.text.clear();
                msg.text.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Mark a pending message as finalized
    pub fn finalize(&mut self, id: MessageId) -> bool {
        match self.get_mut(id) {
            Some(msg) if msg.pending => {
                msg.pending = false;
                true
            }
            _ => false,
        }
    }

    /// Look up a message by ID
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        // IDs are assigned in push order, so the log is sorted by ID
        self.messages
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|idx| &self.messages[idx])
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(move |idx| &mut self.messages[idx])
    }

    /// Most recent finalized assistant message
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_assistant() && !m.pending)
    }

    /// All messages in arrival order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
