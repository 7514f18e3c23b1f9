//! AI gateway
//!
//! The only component that calls the generative backend. It creates
//! conversation sessions from user preferences, streams chat turns
//! (optionally with a photo), generates dish images and synthesizes speech.
//!
//! Chat failures are reported in-band as [`TurnEvent::Failure`]; image and
//! speech failures are logged and degrade to `None`.

pub mod backend;
pub mod prompts;
pub mod session;

pub use backend::GenerativeBackend;
pub use session::ChatSession;

use crate::chat::attachment::{strip_data_uri_prefix, InlineImage};
use crate::error::AppError;
use crate::gemini::constants::{AUDIO_MODALITY, SQUARE_ASPECT_RATIO};
use crate::gemini::types::{
    Content, GenerateContentRequest, GenerationConfig, ImageConfig, InlineData, Part,
    SpeechConfig,
};
use crate::gemini::GeminiConfig;
use crate::state::Preferences;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One element of a streamed chat turn
#[derive(Debug)]
pub enum TurnEvent {
    /// Incremental text, to be appended to what came before
    Delta(String),
    /// The turn completed normally
    End,
    /// The turn failed; no further events follow
    Failure(AppError),
}

/// Orchestrates all backend calls
#[derive(Clone)]
pub struct AiGateway {
    backend: Arc<dyn GenerativeBackend>,
    config: GeminiConfig,
}

impl AiGateway {
    /// Create a gateway over an injected backend capability
    pub fn new(backend: Arc<dyn GenerativeBackend>, config: GeminiConfig) -> Self {
        Self { backend, config }
    }

    /// Create a conversation session seeded with `preferences`
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the backend cannot accept calls.
    pub fn create_session(&self, preferences: &Preferences) -> Result<ChatSession, AppError> {
        self.backend.ensure_ready().map_err(|e| {
            error!(error = %e, "Failed to create chat session");
            AppError::BackendUnavailable(e.to_string())
        })?;

        let session = ChatSession::new(
            self.config.chat_model.clone(),
            self.config.temperature,
            prompts::system_instruction(preferences),
        );
        info!(
            session_id = %session.id(),
            model = %session.model(),
            language = %preferences.language,
            "Chat session created"
        );
        Ok(session)
    }

    /// Compose the content of a user turn: text part first, then the photo
    pub fn compose_turn(text: &str, image: Option<&InlineImage>) -> Content {
        let mut parts = vec![Part::text(prompts::turn_text(text, image.is_some()))];
        if let Some(image) = image {
            parts.push(image.to_part());
        }
        Content::user(parts)
    }

    /// Send one user turn and stream the reply
    ///
    /// Yields `Delta`s in emission order, then exactly one `End` or
    /// `Failure`. The exchange is added to the session history only when
    /// the turn ends normally.
    pub fn stream_turn<'a>(
        &'a self,
        session: &'a mut ChatSession,
        text: &str,
        image: Option<&InlineImage>,
    ) -> impl Stream<Item = TurnEvent> + Send + 'a {
        let turn = Self::compose_turn(text, image);
        let request = session.request_for(&turn);

        async_stream::stream! {
            debug!(
                session_id = %session.id(),
                parts = turn.parts.len(),
                history = session.history().len(),
                "Streaming chat turn"
            );

            let mut chunks = match self
                .backend
                .stream_generate_content(session.model(), &request)
                .await
            {
                Ok(chunks) => chunks,
                Err(e) => {
                    error!(session_id = %session.id(), error = %e, "Chat turn failed to start");
                    yield TurnEvent::Failure(AppError::StreamFailure(e.to_string()));
                    return;
                }
            };

            let mut reply = String::new();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(chunk) => {
                        let text = chunk.text();
                        if !text.is_empty() {
                            reply.push_str(&text);
                            yield TurnEvent::Delta(text);
                        }
                    }
                    Err(e) => {
                        error!(session_id = %session.id(), error = %e, "Chat stream failed");
                        yield TurnEvent::Failure(AppError::StreamFailure(e.to_string()));
                        return;
                    }
                }
            }

            debug!(session_id = %session.id(), reply_len = reply.len(), "Chat turn completed");
            session.record_exchange(turn, reply);
            yield TurnEvent::End;
        }
    }

    /// Generate a square food photograph of `dish`
    ///
    /// Returns `None` if the call fails or the response carries no image.
    pub async fn generate_image(&self, dish: &str) -> Option<InlineImage> {
        match self.try_generate_image(dish).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, "Image generation failed");
                None
            }
        }
    }

    async fn try_generate_image(&self, dish: &str) -> Result<InlineImage, AppError> {
        let request = GenerateContentRequest::from_prompt(prompts::image_prompt(dish))
            .with_generation_config(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: SQUARE_ASPECT_RATIO.to_string(),
                }),
                ..Default::default()
            });

        let response = self
            .backend
            .generate_content(&self.config.image_model, &request)
            .await
            .map_err(|e| AppError::GenerationFailure(e.to_string()))?;

        let inline = find_inline(response.parts(), "image/").ok_or_else(|| {
            AppError::GenerationFailure("response contains no image part".to_string())
        })?;
        let data = decode_inline(inline)?;

        info!(bytes = data.len(), mime = %inline.mime_type, "Dish image generated");
        Ok(InlineImage::generated(mime_or(inline, "image/png"), data))
    }

    /// Synthesize speech for `text` (truncated to the configured limit)
    ///
    /// Returns raw 16-bit PCM bytes, or `None` if the call fails or the
    /// response carries no audio.
    pub async fn synthesize_speech(&self, text: &str) -> Option<Vec<u8>> {
        match self.try_synthesize_speech(text).await {
            Ok(pcm) => Some(pcm),
            Err(e) => {
                warn!(error = %e, "Speech synthesis failed");
                None
            }
        }
    }

    async fn try_synthesize_speech(&self, text: &str) -> Result<Vec<u8>, AppError> {
        let text = prompts::truncate_for_speech(text, self.config.speech_char_limit);
        let request =
            GenerateContentRequest::from_prompt(text).with_generation_config(GenerationConfig {
                response_modalities: Some(vec![AUDIO_MODALITY.to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(self.config.voice_name.clone())),
                ..Default::default()
            });

        let response = self
            .backend
            .generate_content(&self.config.speech_model, &request)
            .await
            .map_err(|e| AppError::GenerationFailure(e.to_string()))?;

        let inline = find_inline(response.parts(), "audio/").ok_or_else(|| {
            AppError::GenerationFailure("response contains no audio part".to_string())
        })?;
        let pcm = decode_inline(inline)?;

        info!(bytes = pcm.len(), voice = %self.config.voice_name, "Speech synthesized");
        Ok(pcm)
    }
}

/// First inline part whose MIME type matches `prefix` (or is unspecified)
fn find_inline<'a>(parts: &'a [Part], prefix: &str) -> Option<&'a InlineData> {
    parts
        .iter()
        .filter_map(|p| p.inline_data.as_ref())
        .find(|d| d.mime_type.is_empty() || d.mime_type.starts_with(prefix))
}

fn decode_inline(inline: &InlineData) -> Result<Vec<u8>, AppError> {
    STANDARD
        .decode(strip_data_uri_prefix(&inline.data))
        .map_err(|e| AppError::GenerationFailure(format!("invalid base64 payload: {}", e)))
}

fn mime_or(inline: &InlineData, fallback: &str) -> String {
    if inline.mime_type.is_empty() {
        fallback.to_string()
    } else {
        inline.mime_type.clone()
    }
}
