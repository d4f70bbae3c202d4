//! news-narrator: two-button, voice-narrated news reader.

mod buttons;
mod config;
mod display;
mod error;
mod narration;
mod news;
mod session;

#[cfg(test)]
mod testing;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::buttons::{EvdevButtons, InputSource};
use crate::config::{DisplayBackend, PlayerBackend};
use crate::display::{ConsoleDisplay, DisplaySink, Layout, NotifyDisplay};
use crate::narration::playback::PlaybackTask;
use crate::narration::player::{CommandPlayer, Player, RodioPlayer};
use crate::narration::tts::ElevenLabsNarrator;
use crate::news::NewsPipeline;
use crate::session::{Collaborators, SessionController, SessionSettings, SessionState};

#[derive(Parser, Debug)]
#[command(name = "news-narrator", about = "Two-button, voice-narrated news reader")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (suppress noisy HTTP internals)
    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info,rustls=info")
    } else {
        EnvFilter::new("info,hyper=warn,reqwest=warn,rustls=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("news-narrator starting");

    let config = config::Config::load(args.config.as_deref());
    info!("Config loaded: {:?}", config.buttons);

    let layout = Layout::from_config(&config.display);
    info!(
        "Display {}x{}: {} lines of {} chars",
        config.display.width, config.display.height, layout.max_lines, layout.chars_per_line
    );
    let mut display: Box<dyn DisplaySink> = match config.display.backend {
        DisplayBackend::Console => Box::new(ConsoleDisplay::new(&layout)),
        DisplayBackend::Notify => Box::new(NotifyDisplay::new(config.display.hold_ms)),
    };

    // Buttons are required; without them nothing can be driven.
    let pins = match EvdevButtons::open(&config.buttons) {
        Ok(pins) => pins,
        Err(e) => {
            error!("Button setup failed: {e}");
            let _ = display.render(&layout.frame("Button error"));
            return Err(e.into());
        }
    };
    let input = InputSource::new(Box::new(pins), Duration::from_millis(config.buttons.debounce_ms));

    let player: Box<dyn Player> = match config.playback.backend {
        PlayerBackend::Rodio => Box::new(RodioPlayer::new()),
        PlayerBackend::Command => Box::new(CommandPlayer::new(config.playback.command.clone())),
    };
    let playback = PlaybackTask::new(Box::new(ElevenLabsNarrator::new(&config.narration)), player);
    info!("Playback backend: {:?}", config.playback.backend);

    let pipeline = NewsPipeline::new(&config.news, &config.summarizer);

    let mut controller = SessionController::new(
        SessionSettings::from_config(&config),
        Collaborators {
            input,
            pipeline: Box::new(pipeline),
            playback,
            display,
        },
    );

    let outcome = tokio::select! {
        state = controller.run() => state,
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down");
            SessionState::Aborted
        }
        _ = wait_for_sigterm() => {
            info!("Received SIGTERM, shutting down");
            SessionState::Aborted
        }
    };

    controller.release();
    info!("Session ended: {outcome}");

    Ok(())
}

/// Wait for SIGTERM (sent by systemd on stop).
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to register SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    // Ctrl+C still works
    std::future::pending::<()>().await
}
