//! Conversation controller
//!
//! Owns the message log, the session status, the user preferences and the
//! pending photo. Drives the gateway for chat turns, dish visualizations and
//! recipe readings.
//!
//! Every backend-contacting action first moves the status from `Idle` to its
//! busy value under the state lock, and always restores `Idle` when it
//! finishes. An action requested while the status is not `Idle` is a no-op,
//! so at most one backend call is outstanding at a time.

use crate::audio::{self, AudioSink};
use crate::chat::attachment::{check_upload_size, InlineImage};
use crate::chat::events::{ControllerEvent, EVENT_CHANNEL_CAPACITY};
use crate::chat::heuristics::visualization_prompt;
use crate::chat::log::MessageLog;
use crate::chat::models::{Message, MessageId, SessionStatus};
use crate::error::AppError;
use crate::gateway::prompts::{APOLOGY_MESSAGE, WELCOME_MESSAGE};
use crate::gateway::{AiGateway, ChatSession, TurnEvent};
use crate::gemini::constants::{SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use crate::state::{Preferences, PreferencesStore, PreferencesUpdate};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Observable conversation state
#[derive(Debug, Default)]
struct ConversationState {
    log: MessageLog,
    status: SessionStatus,
    preferences: PreferencesStore,
    pending_image: Option<InlineImage>,
}

/// Application-level orchestrator for one conversation
pub struct ConversationController {
    gateway: AiGateway,
    state: Arc<RwLock<ConversationState>>,
    session: Mutex<Option<ChatSession>>,
    audio: Arc<dyn AudioSink>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ConversationController {
    /// Create a controller and its first conversation session
    ///
    /// If the session cannot be created the controller starts without one;
    /// chat turns are no-ops until [`reconnect`](Self::reconnect) succeeds.
    pub fn new(gateway: AiGateway, preferences: Preferences, audio: Arc<dyn AudioSink>) -> Self {
        let session = match gateway.create_session(&preferences) {
            Ok(session) => Some(session),
            Err(e) => {
                error!(error = %e, "Starting without a chat session");
                None
            }
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            gateway,
            state: Arc::new(RwLock::new(ConversationState {
                preferences: PreferencesStore::new(preferences),
                ..Default::default()
            })),
            session: Mutex::new(session),
            audio,
            events,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ControllerEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Current status
    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status
    }

    /// Snapshot of the transcript
    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.log.messages().to_vec()
    }

    /// Look up one message
    pub async fn message(&self, id: MessageId) -> Option<Message> {
        self.state.read().await.log.get(id).cloned()
    }

    /// Most recent finalized assistant message
    pub async fn last_assistant_message(&self) -> Option<Message> {
        self.state.read().await.log.last_assistant().cloned()
    }

    /// Current preferences
    pub async fn preferences(&self) -> Preferences {
        self.state.read().await.preferences.get()
    }

    /// Photo waiting to be sent with the next turn
    pub async fn pending_image(&self) -> Option<InlineImage> {
        self.state.read().await.pending_image.clone()
    }

    /// ID of the current conversation session
    pub async fn session_id(&self) -> Option<Uuid> {
        self.session.lock().await.as_ref().map(ChatSession::id)
    }

    /// Whether a conversation session exists
    pub async fn is_ready(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Append the assistant's greeting
    pub async fn greet(&self) {
        let message = {
            let mut state = self.state.write().await;
            state
                .log
                .push_assistant(WELCOME_MESSAGE.to_string(), None)
                .clone()
        };
        self.emit(ControllerEvent::MessageAppended { message });
    }

    /// Retry session creation with the current preferences
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the session still cannot be created.
    pub async fn reconnect(&self) -> Result<Uuid, AppError> {
        let preferences = self.preferences().await;
        let created = self.gateway.create_session(&preferences)?;
        let session_id = created.id();
        *self.session.lock().await = Some(created);
        self.emit(ControllerEvent::SessionReset {
            session_id: Some(session_id),
        });
        Ok(session_id)
    }

    /// Hold a photo for the next turn, replacing any previous one
    pub async fn attach_image(&self, image: InlineImage) {
        self.state.write().await.pending_image = Some(image);
    }

    /// Validate and hold an uploaded photo
    ///
    /// # Errors
    /// Returns `AttachmentTooLarge` above the upload limit; state is unchanged.
    pub async fn attach_upload(&self, bytes: Vec<u8>) -> Result<(), AppError> {
        check_upload_size(bytes.len())?;
        self.attach_image(InlineImage::from_upload(bytes)?).await;
        Ok(())
    }

    /// Drop the pending photo
    pub async fn clear_attachment(&self) {
        self.state.write().await.pending_image = None;
    }

    /// Move from `Idle` to `busy`; false if another action is outstanding
    async fn try_begin(&self, busy: SessionStatus) -> bool {
        {
            let mut state = self.state.write().await;
            if !state.status.is_idle() {
                debug!(status = ?state.status, requested = ?busy, "Action ignored, controller busy");
                return false;
            }
            state.status = busy;
        }
        self.emit(ControllerEvent::StatusChanged { status: busy });
        true
    }

    async fn finish(&self) {
        self.state.write().await.status = SessionStatus::Idle;
        self.emit(ControllerEvent::StatusChanged {
            status: SessionStatus::Idle,
        });
    }

    /// Submit the text together with the pending photo (if any)
    ///
    /// The pending photo is cleared only when the turn is accepted.
    pub async fn send(&self, text: &str) -> bool {
        self.submit_turn(text, None, true).await
    }

    /// Submit a user turn and stream the reply into the log
    ///
    /// No-op (returns false) if both text and image are empty, if another
    /// action is outstanding, or if there is no conversation session.
    pub async fn submit(&self, text: &str, image: Option<InlineImage>) -> bool {
        self.submit_turn(text, image, false).await
    }

    async fn submit_turn(
        &self,
        text: &str,
        image: Option<InlineImage>,
        use_pending: bool,
    ) -> bool {
        // No session means nothing to do and nothing to announce. A locked
        // session is in use by another action, which `Idle` below rules on.
        if matches!(self.session.try_lock(), Ok(guard) if guard.is_none()) {
            warn!("No chat session, message not sent");
            return false;
        }

        let (image, took_pending) = {
            let mut state = self.state.write().await;
            if !state.status.is_idle() {
                debug!(status = ?state.status, "Message ignored, controller busy");
                return false;
            }
            let (image, took_pending) = match image {
                Some(image) => (Some(image), false),
                None if use_pending => {
                    let pending = state.pending_image.take();
                    let took = pending.is_some();
                    (pending, took)
                }
                None => (None, false),
            };
            if text.trim().is_empty() && image.is_none() {
                return false;
            }
            state.status = SessionStatus::Sending;
            (image, took_pending)
        };
        self.emit(ControllerEvent::StatusChanged {
            status: SessionStatus::Sending,
        });

        let mut session_guard = self.session.lock().await;
        let Some(session) = session_guard.as_mut() else {
            warn!("No chat session, message not sent");
            if took_pending {
                let mut state = self.state.write().await;
                if state.pending_image.is_none() {
                    state.pending_image = image;
                }
            }
            self.finish().await;
            return false;
        };

        let (user_message, reply_message) = {
            let mut state = self.state.write().await;
            let user = state.log.push_user(text.to_string(), image.clone()).clone();
            let reply = state.log.push_placeholder().clone();
            (user, reply)
        };

        let reply_id = reply_message.id;
        self.emit(ControllerEvent::MessageAppended {
            message: user_message,
        });
        self.emit(ControllerEvent::MessageAppended {
            message: reply_message,
        });

        let stream = self.gateway.stream_turn(session, text, image.as_ref());
        tokio::pin!(stream);

        let mut accumulated = String::new();
        while let Some(event) = stream.next().await {
            match event {
                TurnEvent::Delta(delta) => {
                    accumulated.push_str(&delta);
                    self.state.write().await.log.set_text(reply_id, &accumulated);
                    self.emit(ControllerEvent::MessageUpdated {
                        id: reply_id,
                        text: accumulated.clone(),
                        pending: true,
                    });
                }
                TurnEvent::End => break,
                TurnEvent::Failure(e) => {
                    warn!(error = %e, "Chat turn failed, replacing reply with apology");
                    accumulated = APOLOGY_MESSAGE.to_string();
                    self.state.write().await.log.set_text(reply_id, &accumulated);
                    break;
                }
            }
        }

        self.state.write().await.log.finalize(reply_id);
        self.emit(ControllerEvent::MessageUpdated {
            id: reply_id,
            text: accumulated,
            pending: false,
        });
        self.finish().await;
        true
    }

    /// Generate a picture of `prompt` and append it as a new message
    ///
    /// No-op (returns false) unless the controller is idle.
    pub async fn request_visualization(&self, prompt: &str) -> bool {
        if !self.try_begin(SessionStatus::GeneratingImage).await {
            return false;
        }

        if let Some(image) = self.gateway.generate_image(prompt).await {
            let caption = format!("Here is a visualization of the {}:", prompt);
            let message = {
                let mut state = self.state.write().await;
                state.log.push_assistant(caption, Some(image)).clone()
            };
            self.emit(ControllerEvent::MessageAppended { message });
        }

        self.finish().await;
        true
    }

    /// Visualize the dish described by a finalized assistant message
    pub async fn visualize_message(&self, id: MessageId) -> bool {
        match self.finalized_assistant_text(id).await {
            Some(text) => self.request_visualization(&visualization_prompt(&text)).await,
            None => false,
        }
    }

    /// Read `text` aloud; nothing is added to the log
    ///
    /// No-op (returns false) unless the controller is idle.
    pub async fn request_reading(&self, text: &str) -> bool {
        if !self.try_begin(SessionStatus::GeneratingAudio).await {
            return false;
        }

        if let Some(pcm) = self.gateway.synthesize_speech(text).await {
            let played = audio::decode_pcm16(&pcm, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)
                .and_then(|buffer| self.audio.play(buffer));
            if let Err(e) = played {
                warn!(error = %e, "Recipe reading could not be played");
            }
        }

        self.finish().await;
        true
    }

    /// Read a finalized assistant message aloud
    pub async fn read_message(&self, id: MessageId) -> bool {
        match self.finalized_assistant_text(id).await {
            Some(text) => self.request_reading(&text).await,
            None => false,
        }
    }

    async fn finalized_assistant_text(&self, id: MessageId) -> Option<String> {
        let state = self.state.read().await;
        state
            .log
            .get(id)
            .filter(|m| m.is_assistant() && !m.pending)
            .map(|m| m.text.clone())
    }

    /// Apply a preferences edit
    ///
    /// A change of language replaces the conversation session (prior turns
    /// are forgotten); other fields only affect sessions created later.
    pub async fn update_preferences(&self, update: PreferencesUpdate) -> Preferences {
        let (previous, current) = {
            let mut state = self.state.write().await;
            let previous = state.preferences.get();
            let current = state.preferences.set(update);
            (previous, current)
        };

        if previous.language != current.language {
            info!(
                from = %previous.language,
                to = %current.language,
                "Language changed, starting a new chat session"
            );
            let mut session = self.session.lock().await;
            *session = self.gateway.create_session(&current).ok();
            let session_id = session.as_ref().map(ChatSession::id);
            drop(session);
            self.emit(ControllerEvent::SessionReset { session_id });
        }

        current
    }
}
