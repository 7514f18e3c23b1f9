//! Conversation controller tests
//!
//! Drive the controller end-to-end through a scripted in-memory backend and
//! a recording audio sink.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chef_mate::audio::{AudioBuffer, AudioSink};
use chef_mate::chat::attachment::MAX_ATTACHMENT_BYTES;
use chef_mate::chat::{ControllerEvent, ConversationController, InlineImage, MessageRole, SessionStatus};
use chef_mate::error::AppError;
use chef_mate::gateway::prompts::{APOLOGY_MESSAGE, DEFAULT_IMAGE_TURN_PROMPT};
use chef_mate::gateway::{AiGateway, GenerativeBackend};
use chef_mate::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use chef_mate::gemini::{GeminiConfig, GeminiError, ResponseStream};
use chef_mate::state::{Language, Preferences, PreferencesUpdate};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

type Chunk = Result<GenerateContentResponse, GeminiError>;

enum TurnScript {
    Chunks(Vec<Chunk>),
    FailToStart,
    Gated(mpsc::UnboundedReceiver<Chunk>),
}

#[derive(Default)]
struct ScriptedBackend {
    unavailable: AtomicBool,
    turns: Mutex<VecDeque<TurnScript>>,
    one_shot: Mutex<VecDeque<Result<GenerateContentResponse, GeminiError>>>,
    requests: Mutex<Vec<(String, GenerateContentRequest)>>,
}

impl ScriptedBackend {
    fn push_turn(&self, script: TurnScript) {
        self.turns.lock().unwrap().push_back(script);
    }

    fn push_one_shot(&self, response: Result<GenerateContentResponse, GeminiError>) {
        self.one_shot.lock().unwrap().push_back(response);
    }

    fn requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.requests.lock().unwrap().clone()
    }

    fn last_request(&self) -> GenerateContentRequest {
        self.requests().pop().expect("no request recorded").1
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn ensure_ready(&self) -> Result<(), GeminiError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(GeminiError::MissingApiKey)
        } else {
            Ok(())
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));
        self.one_shot
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GenerateContentResponse::default()))
    }

    async fn stream_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream, GeminiError> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));
        let script = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TurnScript::Chunks(Vec::new()));
        match script {
            TurnScript::Chunks(chunks) => Ok(Box::pin(futures_util::stream::iter(chunks))),
            TurnScript::FailToStart => Err(GeminiError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
            TurnScript::Gated(rx) => Ok(Box::pin(UnboundedReceiverStream::new(rx))),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    played: Mutex<Vec<AudioBuffer>>,
}

impl AudioSink for RecordingSink {
    fn play(&self, buffer: AudioBuffer) -> Result<(), AppError> {
        self.played.lock().unwrap().push(buffer);
        Ok(())
    }
}

fn text_chunk(text: &str) -> Chunk {
    Ok(serde_json::from_value(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    }))
    .unwrap())
}

fn inline_response(mime_type: &str, data: &[u8]) -> GenerateContentResponse {
    serde_json::from_value(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(data) } }]
            }
        }]
    }))
    .unwrap()
}

fn server_error() -> GeminiError {
    GeminiError::Status {
        status: 500,
        body: "boom".to_string(),
    }
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    sink: Arc<RecordingSink>,
    controller: Arc<ConversationController>,
}

fn harness_with(backend: ScriptedBackend) -> Harness {
    let backend = Arc::new(backend);
    let sink = Arc::new(RecordingSink::default());
    let gateway = AiGateway::new(backend.clone(), GeminiConfig::default());
    let controller = Arc::new(ConversationController::new(
        gateway,
        Preferences::default(),
        sink.clone(),
    ));
    Harness {
        backend,
        sink,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedBackend::default())
}

async fn wait_for_status(controller: &ConversationController, status: SessionStatus) {
    for _ in 0..200 {
        if controller.status().await == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("controller never reached {:?}", status);
}

#[tokio::test]
async fn test_streamed_reply_is_concatenation_of_fragments() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(vec![
        text_chunk("Here's a "),
        text_chunk("Chicken Rice "),
        text_chunk("recipe!"),
    ]));

    assert!(h.controller.submit("chicken, rice, tomato", None).await);

    let messages = h.controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].text, "chicken, rice, tomato");
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].text, "Here's a Chicken Rice recipe!");
    assert!(!messages[1].pending);
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_zero_fragments_finalize_empty_reply() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(Vec::new()));

    assert!(h.controller.submit("hello", None).await);

    let messages = h.controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "");
    assert!(!messages[1].pending);
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_mid_stream_failure_replaces_reply_with_apology() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(vec![
        text_chunk("Partial "),
        Err(server_error()),
        text_chunk("never seen"),
    ]));

    assert!(h.controller.submit("pasta?", None).await);

    let messages = h.controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, APOLOGY_MESSAGE);
    assert!(!messages[1].pending);
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_failure_to_start_yields_apology() {
    let h = harness();
    h.backend.push_turn(TurnScript::FailToStart);

    assert!(h.controller.submit("pasta?", None).await);

    let messages = h.controller.messages().await;
    assert_eq!(messages[1].text, APOLOGY_MESSAGE);
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_empty_submit_is_noop() {
    let h = harness();

    assert!(!h.controller.submit("", None).await);
    assert!(!h.controller.submit("   ", None).await);

    assert!(h.controller.messages().await.is_empty());
    assert!(h.backend.requests().is_empty());
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_photo_without_text_uses_default_prompt() {
    let h = harness();
    h.backend
        .push_turn(TurnScript::Chunks(vec![text_chunk("I see eggs and spinach.")]));
    let photo = InlineImage::from_upload(vec![0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

    assert!(h.controller.submit("", Some(photo.clone())).await);

    let messages = h.controller.messages().await;
    assert_eq!(messages[0].image.as_ref(), Some(&photo));

    let request = h.backend.last_request();
    let turn = request.contents.last().unwrap();
    assert_eq!(turn.parts.len(), 2);
    assert_eq!(turn.parts[0].text.as_deref(), Some(DEFAULT_IMAGE_TURN_PROMPT));
    let inline = turn.parts[1].inline_data.as_ref().unwrap();
    assert_eq!(inline.mime_type, "image/jpeg");
    assert_eq!(inline.data, photo.to_base64());
}

#[tokio::test]
async fn test_history_is_replayed_and_failed_turns_are_forgotten() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk("Try dal.")]));
    h.backend.push_turn(TurnScript::Chunks(vec![Err(server_error())]));
    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk("Sure.")]));

    assert!(h.controller.submit("lentils?", None).await);
    assert!(h.controller.submit("spicier?", None).await);
    assert!(h.controller.submit("spicier please", None).await);

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].0, GeminiConfig::default().chat_model);
    assert_eq!(requests[0].1.contents.len(), 1);
    assert_eq!(requests[1].1.contents.len(), 3);
    // The failed exchange is not part of the history
    assert_eq!(requests[2].1.contents.len(), 3);
    assert_eq!(requests[2].1.contents[1].text(), "Try dal.");
}

#[tokio::test]
async fn test_same_language_keeps_session() {
    let h = harness();
    let before = h.controller.session_id().await.unwrap();

    let update = PreferencesUpdate::parse_field("diet", "vegan").unwrap();
    let prefs = h.controller.update_preferences(update).await;

    assert_eq!(prefs.diet.as_str(), "Vegan");
    assert_eq!(h.controller.session_id().await, Some(before));
}

#[tokio::test]
async fn test_language_change_replaces_session() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk("Hello!")]));
    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk("Namaste!")]));
    assert!(h.controller.submit("hi", None).await);
    let before = h.controller.session_id().await.unwrap();
    let mut events = h.controller.subscribe();

    let prefs = h
        .controller
        .update_preferences(PreferencesUpdate {
            language: Some(Language::Hindi),
            ..Default::default()
        })
        .await;
    assert_eq!(prefs.language, Language::Hindi);

    let after = h.controller.session_id().await.unwrap();
    assert_ne!(before, after);
    match events.try_recv().unwrap() {
        ControllerEvent::SessionReset { session_id } => assert_eq!(session_id, Some(after)),
        other => panic!("unexpected event {:?}", other),
    }

    assert!(h.controller.submit("phir se", None).await);
    let request = h.backend.last_request();
    assert_eq!(request.contents.len(), 1);
    let instruction = request.system_instruction.unwrap().text();
    assert!(instruction.contains("Preferred language: Hindi"));
}

#[tokio::test]
async fn test_unavailable_backend_and_reconnect() {
    let backend = ScriptedBackend::default();
    backend.unavailable.store(true, Ordering::SeqCst);
    let h = harness_with(backend);

    assert!(!h.controller.is_ready().await);
    assert!(!h.controller.submit("hello", None).await);
    assert!(h.controller.messages().await.is_empty());
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
    assert!(matches!(
        h.controller.reconnect().await,
        Err(AppError::BackendUnavailable(_))
    ));

    h.backend.unavailable.store(false, Ordering::SeqCst);
    let id = h.controller.reconnect().await.unwrap();
    assert_eq!(h.controller.session_id().await, Some(id));

    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk("Hi!")]));
    assert!(h.controller.submit("hello", None).await);
    assert_eq!(h.controller.messages().await.len(), 2);
}

#[tokio::test]
async fn test_submit_without_session_is_silent() {
    let backend = ScriptedBackend::default();
    backend.unavailable.store(true, Ordering::SeqCst);
    let h = harness_with(backend);
    h.controller.attach_upload(vec![0xFF, 0xD8]).await.unwrap();
    let mut events = h.controller.subscribe();

    assert!(!h.controller.submit("hello", None).await);
    assert!(!h.controller.send("what can I cook?").await);

    assert!(events.try_recv().is_err());
    assert!(h.controller.pending_image().await.is_some());
    assert!(h.backend.requests().is_empty());
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_visualization_without_image_appends_nothing() {
    let h = harness();
    h.backend.push_one_shot(Ok(GenerateContentResponse::default()));
    h.backend.push_one_shot(Err(server_error()));

    assert!(h.controller.request_visualization("Paneer Tikka").await);
    assert!(h.controller.request_visualization("Paneer Tikka").await);

    assert!(h.controller.messages().await.is_empty());
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_visualization_appends_one_message() {
    let h = harness();
    h.backend
        .push_one_shot(Ok(inline_response("image/png", &[0x89, 0x50, 0x4E, 0x47])));

    assert!(h.controller.request_visualization("Paneer Tikka").await);

    let messages = h.controller.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].text, "Here is a visualization of the Paneer Tikka:");
    let image = messages[0].image.as_ref().unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.data, vec![0x89, 0x50, 0x4E, 0x47]);

    let (model, request) = h.backend.requests().pop().unwrap();
    assert_eq!(model, GeminiConfig::default().image_model);
    let config = request.generation_config.unwrap();
    assert_eq!(config.image_config.unwrap().aspect_ratio, "1:1");
    assert!(request.contents[0].text().contains("Paneer Tikka"));
}

#[tokio::test]
async fn test_visualize_message_uses_first_heading_free_line() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk(
        "# Recipe\n**Masala Omelette**\n## Ingredients\n- eggs\n## Instructions\n1. whisk",
    )]));
    h.backend
        .push_one_shot(Ok(inline_response("image/png", &[1, 2, 3])));
    assert!(h.controller.submit("eggs", None).await);
    let reply = h.controller.last_assistant_message().await.unwrap();

    assert!(h.controller.visualize_message(reply.id).await);

    let last = h.controller.messages().await.pop().unwrap();
    assert_eq!(last.text, "Here is a visualization of the Masala Omelette:");
}

#[tokio::test]
async fn test_actions_on_user_messages_are_rejected() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk("ok")]));
    assert!(h.controller.submit("eggs", None).await);
    let user = h.controller.messages().await[0].id;

    assert!(!h.controller.visualize_message(user).await);
    assert!(!h.controller.read_message(user).await);
    assert_eq!(h.backend.requests().len(), 1);
}

#[tokio::test]
async fn test_reading_plays_audio_without_logging() {
    let h = harness();
    let pcm: Vec<u8> = [0i16, 16384, -16384, 32767]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    h.backend
        .push_one_shot(Ok(inline_response("audio/L16;codec=pcm;rate=24000", &pcm)));

    assert!(h.controller.request_reading("Step 1: boil water.").await);

    let played = h.sink.played.lock().unwrap().clone();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].sample_rate(), 24_000);
    assert_eq!(played[0].channel_count(), 1);
    assert_eq!(played[0].frame_count(), 4);
    assert_eq!(played[0].channel(0).unwrap()[1], 0.5);
    assert!(h.controller.messages().await.is_empty());
    assert_eq!(h.controller.status().await, SessionStatus::Idle);

    let (model, request) = h.backend.requests().pop().unwrap();
    assert_eq!(model, GeminiConfig::default().speech_model);
    let config = request.generation_config.unwrap();
    assert_eq!(config.response_modalities, Some(vec!["AUDIO".to_string()]));
}

#[tokio::test]
async fn test_failed_reading_plays_nothing() {
    let h = harness();
    h.backend.push_one_shot(Err(server_error()));

    assert!(h.controller.request_reading("Step 1").await);

    assert!(h.sink.played.lock().unwrap().is_empty());
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_long_reading_is_truncated() {
    let h = harness();
    h.backend.push_one_shot(Err(server_error()));

    assert!(h.controller.request_reading(&"a".repeat(800)).await);

    let request = h.backend.last_request();
    let text = request.contents[0].text();
    assert_eq!(text.chars().count(), 503);
    assert!(text.ends_with("..."));
}

#[tokio::test]
async fn test_actions_are_noops_while_a_turn_is_outstanding() {
    let h = harness();
    let (tx, rx) = mpsc::unbounded_channel();
    h.backend.push_turn(TurnScript::Gated(rx));
    let photo = InlineImage::from_upload(vec![1, 2, 3]).unwrap();
    h.controller.attach_image(photo.clone()).await;

    let controller = h.controller.clone();
    let turn = tokio::spawn(async move { controller.submit("first", None).await });
    wait_for_status(&h.controller, SessionStatus::Sending).await;

    assert!(!h.controller.submit("second", None).await);
    assert!(!h.controller.send("third").await);
    assert!(!h.controller.request_visualization("Dal").await);
    assert!(!h.controller.request_reading("Dal").await);
    assert_eq!(h.controller.pending_image().await, Some(photo));
    assert_eq!(h.controller.messages().await.len(), 2);

    tx.send(text_chunk("streamed")).unwrap();
    drop(tx);
    assert!(turn.await.unwrap());

    let messages = h.controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "streamed");
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
    assert_eq!(h.backend.requests().len(), 1);
}

#[tokio::test]
async fn test_pending_message_grows_while_streaming() {
    let h = harness();
    let (tx, rx) = mpsc::unbounded_channel();
    h.backend.push_turn(TurnScript::Gated(rx));

    let controller = h.controller.clone();
    let turn = tokio::spawn(async move { controller.submit("soup?", None).await });
    wait_for_status(&h.controller, SessionStatus::Sending).await;

    tx.send(text_chunk("Tomato ")).unwrap();
    let mut reply = None;
    for _ in 0..200 {
        let message = h.controller.messages().await.pop();
        if message.as_ref().is_some_and(|m| m.text == "Tomato ") {
            reply = message;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let reply = reply.expect("first fragment never arrived");
    assert!(reply.pending);
    assert!(h.controller.last_assistant_message().await.is_none());

    tx.send(text_chunk("soup")).unwrap();
    drop(tx);
    assert!(turn.await.unwrap());
    assert_eq!(h.controller.messages().await[1].text, "Tomato soup");
}

#[tokio::test]
async fn test_send_consumes_pending_attachment() {
    let h = harness();
    h.backend.push_turn(TurnScript::Chunks(vec![text_chunk("Nice fridge.")]));
    h.controller.attach_upload(vec![0xFF, 0xD8]).await.unwrap();

    assert!(h.controller.send("").await);

    assert!(h.controller.pending_image().await.is_none());
    let messages = h.controller.messages().await;
    assert_eq!(messages[0].image.as_ref().unwrap().data, vec![0xFF, 0xD8]);
}

#[tokio::test]
async fn test_send_after_clearing_attachment_is_noop() {
    let h = harness();
    h.controller.attach_upload(vec![0xFF, 0xD8]).await.unwrap();
    h.controller.clear_attachment().await;
    let mut events = h.controller.subscribe();

    assert!(!h.controller.send("").await);

    assert!(events.try_recv().is_err());
    assert!(h.controller.messages().await.is_empty());
    assert!(h.backend.requests().is_empty());
    assert_eq!(h.controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_blank_send_while_busy_keeps_attachment() {
    let h = harness();
    let (tx, rx) = mpsc::unbounded_channel();
    h.backend.push_turn(TurnScript::Gated(rx));
    let controller = h.controller.clone();
    let turn = tokio::spawn(async move { controller.submit("soup?", None).await });
    wait_for_status(&h.controller, SessionStatus::Sending).await;

    h.controller.attach_upload(vec![0xFF, 0xD8]).await.unwrap();
    assert!(!h.controller.send("").await);
    assert!(h.controller.pending_image().await.is_some());

    drop(tx);
    assert!(turn.await.unwrap());
    assert_eq!(h.controller.messages().await.len(), 2);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let h = harness();

    let result = h
        .controller
        .attach_upload(vec![0u8; MAX_ATTACHMENT_BYTES + 1])
        .await;

    assert!(matches!(result, Err(AppError::AttachmentTooLarge { .. })));
    assert!(h.controller.pending_image().await.is_none());

    h.controller.attach_upload(vec![1]).await.unwrap();
    h.controller.clear_attachment().await;
    assert!(h.controller.pending_image().await.is_none());
}

#[tokio::test]
async fn test_events_bracket_a_turn() {
    let h = harness();
    h.backend
        .push_turn(TurnScript::Chunks(vec![text_chunk("a"), text_chunk("b")]));
    let mut events = h.controller.subscribe();

    assert!(h.controller.submit("go", None).await);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert!(matches!(
        received.first(),
        Some(ControllerEvent::StatusChanged {
            status: SessionStatus::Sending
        })
    ));
    assert!(matches!(
        received.last(),
        Some(ControllerEvent::StatusChanged {
            status: SessionStatus::Idle
        })
    ));
    let updates: Vec<(String, bool)> = received
        .iter()
        .filter_map(|e| match e {
            ControllerEvent::MessageUpdated { text, pending, .. } => Some((text.clone(), *pending)),
            _ => None,
        })
        .collect();
    assert_eq!(
        updates,
        vec![
            ("a".to_string(), true),
            ("ab".to_string(), true),
            ("ab".to_string(), false)
        ]
    );
}

#[tokio::test]
async fn test_greeting_is_first_message() {
    let h = harness();
    h.controller.greet().await;

    let messages = h.controller.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert!(messages[0].text.contains("Chef Mate"));
    assert!(h.backend.requests().is_empty());
}
