//! Cancellable narration sessions.
//!
//! `PlaybackTask::start` synthesizes (blocking the caller, not cancellable)
//! and launches a playback unit. The returned `PlaybackSession` owns that
//! unit; cancelling or dropping it terminates and reaps the unit before
//! returning.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::player::{PlaybackUnit, Player};
use super::tts::Narrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Requested,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "REQUESTED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One in-flight narration.
pub struct PlaybackSession {
    label: String,
    status: PlaybackStatus,
    unit: Option<Box<dyn PlaybackUnit>>,
}

impl PlaybackSession {
    fn requested(text: &str) -> Self {
        Self {
            label: preview(text),
            status: PlaybackStatus::Requested,
            unit: None,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Non-blocking liveness check. Reaps the unit once it has finished.
    pub fn poll_alive(&mut self) -> bool {
        let Some(unit) = self.unit.as_mut() else {
            return false;
        };
        if unit.is_alive() {
            return true;
        }
        self.finish(PlaybackStatus::Completed);
        false
    }

    /// Stop playback now. Returns after the unit is gone.
    pub fn cancel(&mut self) {
        let Some(unit) = self.unit.as_mut() else {
            return;
        };
        if unit.is_alive() {
            info!("Stopping playback: {}", self.label);
            self.finish(PlaybackStatus::Cancelled);
        } else {
            self.finish(PlaybackStatus::Completed);
        }
    }

    /// Wait for natural completion, sampling every `tick`.
    pub async fn join(&mut self, tick: Duration) {
        while self.poll_alive() {
            tokio::time::sleep(tick).await;
        }
    }

    fn finish(&mut self, status: PlaybackStatus) {
        if let Some(mut unit) = self.unit.take() {
            unit.terminate();
        }
        if self.status == PlaybackStatus::Running {
            debug!("Playback {} → {status}: {}", self.status, self.label);
            self.status = status;
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Synthesis + playback, one session at a time.
pub struct PlaybackTask {
    narrator: Box<dyn Narrator>,
    player: Box<dyn Player>,
}

impl PlaybackTask {
    pub fn new(narrator: Box<dyn Narrator>, player: Box<dyn Player>) -> Self {
        Self { narrator, player }
    }

    /// Synthesize `text` and launch playback. Failures come back as a
    /// `Failed` session with nothing running.
    pub async fn start(&self, text: &str) -> PlaybackSession {
        let mut session = PlaybackSession::requested(text);

        let clip = match self.narrator.synthesize(text).await {
            Ok(clip) => clip,
            Err(e) => {
                warn!("Narration skipped ({}): {e}", session.label);
                session.status = PlaybackStatus::Failed;
                return session;
            }
        };

        match self.player.launch(clip).await {
            Ok(unit) => {
                session.unit = Some(unit);
                session.status = PlaybackStatus::Running;
                debug!("Playing: {}", session.label);
            }
            Err(e) => {
                warn!("Playback failed ({}): {e}", session.label);
                session.status = PlaybackStatus::Failed;
            }
        }
        session
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 40;
    let text = text.trim();
    if text.chars().count() <= MAX {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX).collect();
    short.push('…');
    short
}
