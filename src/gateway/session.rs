//! Conversation session
//!
//! The REST API is stateless, so the session keeps the system instruction,
//! sampling settings and turn history and replays them with every turn.
//! The instruction is fixed when the session is created.

use crate::gemini::types::{Content, GenerateContentRequest, GenerationConfig};
use uuid::Uuid;

/// Multi-turn conversation state
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    model: String,
    temperature: f32,
    system_instruction: String,
    history: Vec<Content>,
}

impl ChatSession {
    pub(crate) fn new(
        model: String,
        temperature: f32,
        system_instruction: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            temperature,
            system_instruction,
            history: Vec::new(),
        }
    }

    /// Unique session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Model the session talks to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Completed turns, oldest first (user and model alternating)
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Request for the next turn: history followed by `turn`
    pub fn request_for(&self, turn: &Content) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(turn.clone());
        GenerateContentRequest {
            contents,
            system_instruction: Some(Content::instruction(self.system_instruction.clone())),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                ..Default::default()
            }),
        }
    }

    /// Remember a completed exchange
    pub fn record_exchange(&mut self, turn: Content, reply: String) {
        self.history.push(turn);
        self.history.push(Content::model_text(reply));
    }
}
