// Logging behavior:
// - Writes logs to both stderr and a daily-rotated file at logs/meetbot.log.
// - Default log level is INFO. Control via RUST_LOG:
//   * RUST_LOG=info                       # standard logging (default)
//   * RUST_LOG=debug                      # verbose, includes controller state transitions
//   * RUST_LOG=meetbot_session=trace      # fine-grained per-crate control
// - The logs/ directory is created on startup if missing; file output uses a non-blocking writer.
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use meetbot_audio::{AudioFormat, AudioWriter, InMemoryReader, PacedWriter};
use meetbot_foundation::config::SessionConfig;
use meetbot_foundation::error::{MeetbotError, MeetbotResult};
use meetbot_session::{ChatMessage, MeetingController, Participant, SessionComposer};
use meetbot_stt::MockSttEngine;
use meetbot_tts::MockTtsEngine;
use meetbot_vad::{Aggressiveness, EnergyVad, VadStreamer};
use parking_lot::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "meetbot.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

#[derive(Parser, Debug)]
#[command(name = "meetbot", author, version, about = "Meeting transcription and speech bot")]
struct Cli {
    /// Meeting URL to join
    #[arg(long)]
    url: Option<String>,

    /// Optional meeting passcode
    #[arg(long)]
    passcode: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Text to speak after joining, then leave
    #[arg(long, default_value = "hello, this is the meeting bot")]
    say: String,
}

/// Demo meeting backend: logs every call instead of driving a real
/// conferencing client. Stands in for a browser-automation or SIP
/// backend until one is wired up.
struct DemoMeetingController {
    chat_log: Mutex<Vec<ChatMessage>>,
}

impl DemoMeetingController {
    fn new() -> Self {
        Self {
            chat_log: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MeetingController for DemoMeetingController {
    async fn join(&self, url: &str, name: &str, passcode: Option<&str>) -> MeetbotResult<()> {
        tracing::info!(url, name, has_passcode = passcode.is_some(), "joining meeting");
        Ok(())
    }

    async fn leave(&self) -> MeetbotResult<()> {
        tracing::info!("leaving meeting");
        Ok(())
    }

    async fn send_chat_message(&self, text: &str) -> MeetbotResult<()> {
        tracing::info!(text, "sending chat message");
        self.chat_log.lock().push(ChatMessage {
            sender: "meetbot".to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn get_chat_history(&self) -> MeetbotResult<Vec<ChatMessage>> {
        Ok(self.chat_log.lock().clone())
    }

    async fn get_participants(&self) -> MeetbotResult<Vec<Participant>> {
        Ok(vec![Participant {
            id: "demo-participant".to_string(),
            name: "Demo Participant".to_string(),
            is_muted: false,
        }])
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging()?;
    tracing::info!("starting meetbot");

    let cli = Cli::parse();
    let config = SessionConfig::load(cli.config.as_deref(), "MTB")
        .map_err(MeetbotError::Config)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to load configuration, using defaults");
            SessionConfig::default()
        });

    let format = AudioFormat::pcm16(16_000);
    let mut reader = InMemoryReader::new(format, 320, vec![0u8; 32_000]);
    reader.start();
    let streamer = VadStreamer::new(reader, EnergyVad::new(16_000, 20, Aggressiveness::Medium))?;

    let mut writer = PacedWriter::new(format, 320);
    writer.start();
    let writer: Box<dyn AudioWriter> = Box::new(writer);

    let session = SessionComposer::compose(
        config,
        Arc::new(DemoMeetingController::new()),
        streamer,
        Arc::new(MockSttEngine::new(0.02)),
        Arc::new(MockTtsEngine::new(format, 80)),
        writer,
    );

    let url = cli.url.as_deref().unwrap_or("https://meet.example.test/demo");
    session.join_meeting(url, cli.passcode.as_deref()).await?;

    match session.speak_text(&cli.say).await {
        Ok(()) => tracing::info!("spoke greeting successfully"),
        Err(e) if e.is_speech_interrupted() => {
            tracing::info!(error = %e, "speech interrupted by barge-in");
        }
        Err(e) => return Err(e.into()),
    }

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    for segment in session.get_transcript().compact().all() {
        tracing::info!(role = ?segment.role, text = %segment.text, "transcript segment");
    }

    session.leave_meeting(false).await;
    tracing::info!("meetbot shutdown complete");
    Ok(())
}
