//! Chef Mate
//!
//! Line-oriented terminal front end for the cooking assistant. Plain lines
//! are sent as chat turns; lines starting with `/` are commands.

use anyhow::Context;
use chef_mate::audio::wav::WavFileSink;
use chef_mate::audio::AudioSink;
use chef_mate::chat::heuristics::looks_like_recipe;
use chef_mate::chat::{ControllerEvent, ConversationController, MessageId, MessageRole, SessionStatus};
use chef_mate::config::{AudioOutput, Config};
use chef_mate::gateway::AiGateway;
use chef_mate::gemini::GeminiClient;
use chef_mate::state::{Preferences, PreferencesUpdate};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

const HELP: &str = "\
Commands:
  /attach <path>        attach a photo to your next message
  /detach               drop the attached photo
  /set <field> <value>  change a preference (diet, cuisine, skill, allergies, language)
  /prefs                show current preferences
  /visualize [id]       picture the dish from a recipe (default: latest reply)
  /read [id]            read a recipe aloud (default: latest reply)
  /save <id> <path>     save a message's image to a file
  /reconnect            retry connecting to the assistant
  /help                 show this help
  /quit                 exit";

/// One line of user input
#[derive(Debug, PartialEq)]
enum Command {
    Say(String),
    Attach(PathBuf),
    Detach,
    Set(String, String),
    Prefs,
    Visualize(Option<MessageId>),
    Read(Option<MessageId>),
    Save(MessageId, PathBuf),
    Reconnect,
    Help,
    Quit,
}

fn parse_id(raw: &str) -> Result<MessageId, String> {
    raw.trim()
        .parse::<u64>()
        .map(MessageId)
        .map_err(|_| format!("'{}' is not a message id", raw.trim()))
}

fn parse_optional_id(rest: &str) -> Result<Option<MessageId>, String> {
    if rest.trim().is_empty() {
        Ok(None)
    } else {
        parse_id(rest).map(Some)
    }
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Command::Say(line.to_string()));
        };
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(n, r)| (n, r.trim()))
            .unwrap_or((command, ""));

        match name {
            "attach" if !rest.is_empty() => Ok(Command::Attach(PathBuf::from(rest))),
            "attach" => Err("usage: /attach <path>".to_string()),
            "detach" => Ok(Command::Detach),
            "set" => match rest.split_once(char::is_whitespace) {
                Some((field, value)) => Ok(Command::Set(field.to_string(), value.trim().to_string())),
                None => Err("usage: /set <field> <value>".to_string()),
            },
            "prefs" => Ok(Command::Prefs),
            "visualize" => parse_optional_id(rest).map(Command::Visualize),
            "read" => parse_optional_id(rest).map(Command::Read),
            "save" => match rest.split_once(char::is_whitespace) {
                Some((id, path)) => Ok(Command::Save(parse_id(id)?, PathBuf::from(path.trim()))),
                None => Err("usage: /save <id> <path>".to_string()),
            },
            "reconnect" => Ok(Command::Reconnect),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command '/{}', try /help", other)),
        }
    }
}

/// Directory used when speaker output is unavailable
const FALLBACK_READINGS_DIR: &str = "readings";

#[cfg(feature = "playback")]
fn speaker_sink(fallback_dir: &Path) -> anyhow::Result<Arc<dyn AudioSink>> {
    match chef_mate::audio::CpalPlayback::new() {
        Ok(playback) => Ok(Arc::new(playback)),
        Err(e) => {
            warn!(error = %e, dir = %fallback_dir.display(), "No speaker available, writing readings as WAV files");
            Ok(Arc::new(WavFileSink::new(fallback_dir)?))
        }
    }
}

#[cfg(not(feature = "playback"))]
fn speaker_sink(fallback_dir: &Path) -> anyhow::Result<Arc<dyn AudioSink>> {
    warn!(dir = %fallback_dir.display(), "Built without the playback feature, writing readings as WAV files");
    Ok(Arc::new(WavFileSink::new(fallback_dir)?))
}

fn build_audio_sink(output: &AudioOutput, fallback_dir: &Path) -> anyhow::Result<Arc<dyn AudioSink>> {
    match output {
        AudioOutput::Speaker => speaker_sink(fallback_dir),
        AudioOutput::WavDir(dir) => Ok(Arc::new(WavFileSink::new(dir.clone())?)),
    }
}

fn print_preferences(prefs: &Preferences) {
    println!("  diet:      {}", prefs.diet);
    println!("  cuisine:   {}", prefs.cuisine);
    println!("  skill:     {}", prefs.skill_level);
    println!(
        "  allergies: {}",
        if prefs.allergies.is_empty() { "None" } else { prefs.allergies.as_str() }
    );
    println!("  language:  {}", prefs.language);
}

/// Render controller events as they arrive; streamed text is printed
/// incrementally
async fn render_events(mut events: BroadcastStream<ControllerEvent>) {
    let mut printed: HashMap<MessageId, String> = HashMap::new();

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Terminal fell behind on controller events");
                continue;
            }
        };

        match event {
            ControllerEvent::MessageAppended { message } => {
                let who = match message.role {
                    MessageRole::User => "you",
                    MessageRole::Assistant => "chef",
                };
                if message.role == MessageRole::User {
                    if message.image.is_some() {
                        println!("[{}] {}: (photo) {}", message.id, who, message.text);
                    }
                    continue;
                }
                if message.pending {
                    print!("[{}] {}: ", message.id, who);
                    printed.insert(message.id, String::new());
                } else {
                    println!("[{}] {}: {}", message.id, who, message.text);
                    if let Some(image) = &message.image {
                        println!(
                            "    ({} image, {} bytes; /save {} <path>)",
                            image.mime_type,
                            image.len(),
                            message.id
                        );
                    }
                }
            }
            ControllerEvent::MessageUpdated { id, text, pending } => {
                let shown = printed.remove(&id).unwrap_or_default();
                match text.strip_prefix(shown.as_str()) {
                    Some(rest) => print!("{}", rest),
                    None => print!("\n{}", text),
                }
                if pending {
                    printed.insert(id, text);
                } else {
                    println!();
                    if looks_like_recipe(&text) {
                        println!("    (/visualize {} or /read {})", id, id);
                    }
                }
            }
            ControllerEvent::StatusChanged { status } => match status {
                SessionStatus::GeneratingImage => println!("    generating a picture..."),
                SessionStatus::GeneratingAudio => println!("    preparing the reading..."),
                SessionStatus::Sending | SessionStatus::Idle => {}
            },
            ControllerEvent::SessionReset { session_id } => match session_id {
                Some(_) => println!("    (started a new conversation)"),
                None => println!("    (assistant unavailable, try /reconnect)"),
            },
        }
        let _ = std::io::stdout().flush();
    }
}

async fn target_message(
    controller: &ConversationController,
    id: Option<MessageId>,
) -> Option<MessageId> {
    match id {
        Some(id) => Some(id),
        None => controller.last_assistant_message().await.map(|m| m.id),
    }
}

/// Execute one command; returns false when the loop should stop
async fn run_command(controller: &ConversationController, command: Command) -> bool {
    match command {
        Command::Say(text) => {
            if text.is_empty() && controller.pending_image().await.is_none() {
                return true;
            }
            if !controller.send(&text).await && !controller.is_ready().await {
                println!("    (assistant unavailable, try /reconnect)");
            }
        }
        Command::Attach(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let size = bytes.len();
                match controller.attach_upload(bytes).await {
                    Ok(()) => println!("    attached {} ({} KB)", path.display(), size / 1024),
                    Err(e) => println!("    {}", e),
                }
            }
            Err(e) => println!("    cannot read {}: {}", path.display(), e),
        },
        Command::Detach => {
            controller.clear_attachment().await;
            println!("    photo removed");
        }
        Command::Set(field, value) => match PreferencesUpdate::parse_field(&field, &value) {
            Ok(update) => print_preferences(&controller.update_preferences(update).await),
            Err(e) => println!("    {}", e),
        },
        Command::Prefs => print_preferences(&controller.preferences().await),
        Command::Visualize(id) => match target_message(controller, id).await {
            Some(id) => {
                if !controller.visualize_message(id).await {
                    println!("    message {} is not a finished reply", id);
                }
            }
            None => println!("    nothing to visualize yet"),
        },
        Command::Read(id) => match target_message(controller, id).await {
            Some(id) => {
                if !controller.read_message(id).await {
                    println!("    message {} is not a finished reply", id);
                }
            }
            None => println!("    nothing to read yet"),
        },
        Command::Save(id, path) => match controller.message(id).await.and_then(|m| m.image) {
            Some(image) => match tokio::fs::write(&path, &image.data).await {
                Ok(()) => println!("    saved {}", path.display()),
                Err(e) => println!("    cannot write {}: {}", path.display(), e),
            },
            None => println!("    message {} has no image", id),
        },
        Command::Reconnect => {
            if let Err(e) = controller.reconnect().await {
                println!("    {}", e);
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let client = GeminiClient::new(http, config.api_key.clone(), &config.gemini);
    let gateway = AiGateway::new(Arc::new(client), config.gemini.clone());
    let audio = build_audio_sink(&config.audio_out, Path::new(FALLBACK_READINGS_DIR))?;

    let controller = ConversationController::new(gateway, Preferences::default(), audio);
    let renderer = tokio::spawn(render_events(BroadcastStream::new(controller.subscribe())));

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    controller.greet().await;
    if !controller.is_ready().await {
        println!("    (assistant unavailable: set GEMINI_API_KEY, then /reconnect)");
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let keep_going = match Command::parse(&line) {
                    Ok(command) => run_command(&controller, command).await,
                    Err(e) => {
                        println!("    {}", e);
                        true
                    }
                };
                if !keep_going {
                    break;
                }
            }
        }
    }

    drop(controller);
    let _ = renderer.await;
    info!("Chef Mate shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
