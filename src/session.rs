//! Reading session orchestration with state machine.
//!
//! FETCHING → AGE_INPUT → SUMMARIZING → BROWSING ⇄ READING → POST_READING → DONE
//!
//! Any fatal condition lands in ABORTED. The controller runs one cooperative
//! loop: it polls the buttons every tick and never blocks except on the
//! one-shot network calls and button release waits.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::buttons::{InputEvent, InputSource};
use crate::config::Config;
use crate::display::{DisplaySink, Layout};
use crate::error::HardwareError;
use crate::narration::playback::{PlaybackSession, PlaybackStatus, PlaybackTask};
use crate::news::{Article, ContentPipeline, Story};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Fetching,
    AgeInput,
    Summarizing,
    Browsing(usize),
    Reading(usize),
    PostReading(usize),
    Done,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetching => write!(f, "FETCHING"),
            Self::AgeInput => write!(f, "AGE_INPUT"),
            Self::Summarizing => write!(f, "SUMMARIZING"),
            Self::Browsing(i) => write!(f, "BROWSING({i})"),
            Self::Reading(i) => write!(f, "READING({i})"),
            Self::PostReading(i) => write!(f, "POST_READING({i})"),
            Self::Done => write!(f, "DONE"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Age picked with the buttons. Stays in `0..=99` while editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgeSelection(u8);

impl AgeSelection {
    pub const MAX: u8 = 99;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = if self.0 >= Self::MAX { 0 } else { self.0 + 1 };
    }

    /// Freeze the selection. Never returns 0.
    pub fn confirm(self, fallback: u8) -> u8 {
        if self.0 == 0 {
            fallback.clamp(1, Self::MAX)
        } else {
            self.0
        }
    }
}

/// Next browse position in a list of `len` stories.
pub fn advance(index: usize, len: usize) -> usize {
    debug_assert!(len > 0, "browsing an empty story list");
    (index + 1) % len.max(1)
}

/// How a narration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NarrationEnd {
    Finished,
    Skipped,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub fallback_age: u8,
    pub announce_age: bool,
    pub summary_chars: usize,
    pub hold: Duration,
    pub layout: Layout,
    pub next_label: String,
    pub select_label: String,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.session.poll_interval(),
            fallback_age: config.session.fallback_age,
            announce_age: config.session.announce_age,
            summary_chars: config.summarizer.max_chars,
            hold: config.display.hold(),
            layout: Layout::from_config(&config.display),
            next_label: config.buttons.next_label.clone(),
            select_label: config.buttons.select_label.clone(),
        }
    }
}

/// Everything the controller talks to, built once at startup.
pub struct Collaborators {
    pub input: InputSource,
    pub pipeline: Box<dyn ContentPipeline>,
    pub playback: PlaybackTask,
    pub display: Box<dyn DisplaySink>,
}

pub struct SessionController {
    settings: SessionSettings,
    input: InputSource,
    pipeline: Box<dyn ContentPipeline>,
    playback: PlaybackTask,
    display: Box<dyn DisplaySink>,
    state: SessionState,
    articles: Vec<Article>,
    stories: Vec<Story>,
    age: AgeSelection,
    confirmed_age: Option<u8>,
    active: Option<PlaybackSession>,
    shown_help: bool,
    abort_reason: Option<String>,
    trace: Vec<SessionState>,
}

impl SessionController {
    pub fn new(settings: SessionSettings, parts: Collaborators) -> Self {
        Self {
            settings,
            input: parts.input,
            pipeline: parts.pipeline,
            playback: parts.playback,
            display: parts.display,
            state: SessionState::Fetching,
            articles: Vec::new(),
            stories: Vec::new(),
            age: AgeSelection::default(),
            confirmed_age: None,
            active: None,
            shown_help: false,
            abort_reason: None,
            trace: vec![SessionState::Fetching],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn trace(&self) -> &[SessionState] {
        &self.trace
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn confirmed_age(&self) -> Option<u8> {
        self.confirmed_age
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Run the session to DONE or ABORTED.
    pub async fn run(&mut self) -> SessionState {
        info!("Session started");
        while !self.state.is_terminal() {
            let next = match self.step().await {
                Ok(next) => next,
                Err(e) => {
                    error!("Hardware failure in {}: {e}", self.state);
                    self.stop_playback();
                    self.abort(e.part())
                }
            };
            self.transition(next);
        }

        if let Some(reason) = self.abort_reason.clone() {
            if let Err(e) = self.show(&reason, Some(self.settings.hold)).await {
                warn!("Could not show abort message: {e}");
            }
        }
        self.state
    }

    /// Stop any live narration and blank the screen. Safe to call after an
    /// interrupted `run`.
    pub fn release(&mut self) {
        self.stop_playback();
        if let Err(e) = self.display.clear() {
            warn!("Failed to clear display: {e}");
        }
        info!("Session resources released");
    }

    async fn step(&mut self) -> Result<SessionState, HardwareError> {
        match self.state {
            SessionState::Fetching => self.fetch().await,
            SessionState::AgeInput => self.choose_age().await,
            SessionState::Summarizing => self.summarize().await,
            SessionState::Browsing(i) => self.browse(i).await,
            SessionState::Reading(i) => self.read(i).await,
            SessionState::PostReading(i) => self.after_reading(i).await,
            SessionState::Done | SessionState::Aborted => Ok(self.state),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next != self.state {
            info!("State: {} → {}", self.state, next);
            self.state = next;
            self.trace.push(next);
        }
    }

    fn abort(&mut self, message: &str) -> SessionState {
        self.abort_reason = Some(message.to_string());
        SessionState::Aborted
    }

    async fn fetch(&mut self) -> Result<SessionState, HardwareError> {
        self.show("Fetching news...", Some(self.settings.hold)).await?;
        match self.pipeline.fetch().await {
            Ok(articles) if !articles.is_empty() => {
                info!("Fetched {} articles", articles.len());
                self.articles = articles;
                Ok(SessionState::AgeInput)
            }
            Ok(_) => {
                warn!("No readable articles");
                Ok(self.abort("No stories found"))
            }
            Err(e) => {
                error!("News fetch failed: {e}");
                Ok(self.abort("News unavailable"))
            }
        }
    }

    async fn choose_age(&mut self) -> Result<SessionState, HardwareError> {
        self.show_age().await?;
        loop {
            match self.input.wait_event(self.settings.poll_interval).await? {
                InputEvent::Increment => {
                    self.age.increment();
                    self.show_age().await?;
                }
                InputEvent::Confirm => {
                    let age = self.age.confirm(self.settings.fallback_age);
                    info!("Age confirmed: {age}");
                    self.confirmed_age = Some(age);
                    return Ok(SessionState::Summarizing);
                }
            }
        }
    }

    async fn show_age(&mut self) -> Result<(), HardwareError> {
        let text = format!("Set your age:\n{}", self.age.value());
        self.show(&text, None).await
    }

    async fn summarize(&mut self) -> Result<SessionState, HardwareError> {
        let age = self.confirmed_age.unwrap_or(self.settings.fallback_age);

        if self.settings.announce_age {
            self.narrate(&format!("Summarizing news for a {age} year old.")).await?;
        }
        self.show(&format!("Summarizing...\nAge: {age}"), None).await?;

        let articles = std::mem::take(&mut self.articles);
        let max_chars = self.settings.summary_chars;
        let stories: Vec<Story> = self
            .pipeline
            .summarize_all(&articles, age)
            .await
            .into_iter()
            .map(|story| story.truncated(max_chars))
            .collect();

        if stories.is_empty() {
            warn!("Every summary failed");
            return Ok(self.abort("No stories found"));
        }
        self.stories = stories;
        Ok(SessionState::Browsing(0))
    }

    async fn browse(&mut self, index: usize) -> Result<SessionState, HardwareError> {
        if !self.shown_help {
            self.shown_help = true;
            let help = format!("{}: Next\n{}: Read/Quit", self.settings.next_label, self.settings.select_label);
            self.show(&help, Some(self.settings.hold)).await?;
        }

        let screen = format!("Story {}:\n{}", index + 1, self.stories[index].title);
        self.show(&screen, None).await?;

        match self.input.wait_event(self.settings.poll_interval).await? {
            InputEvent::Increment => Ok(SessionState::Browsing(advance(index, self.stories.len()))),
            // select
            InputEvent::Confirm => Ok(SessionState::Reading(index)),
        }
    }

    async fn read(&mut self, index: usize) -> Result<SessionState, HardwareError> {
        self.show("Reading...\nPlease wait", Some(self.settings.hold)).await?;

        let story = self.stories[index].clone();
        if self.narrate(&story.title).await? != NarrationEnd::Skipped {
            self.narrate(&story.content).await?;
        }
        Ok(SessionState::PostReading(index))
    }

    async fn after_reading(&mut self, index: usize) -> Result<SessionState, HardwareError> {
        let prompt = format!("{}: Quit\n{}: Next", self.settings.select_label, self.settings.next_label);
        self.show(&prompt, Some(self.settings.hold)).await?;

        match self.input.wait_event(self.settings.poll_interval).await? {
            InputEvent::Increment => Ok(SessionState::Browsing(advance(index, self.stories.len()))),
            // quit
            InputEvent::Confirm => Ok(SessionState::Done),
        }
    }

    /// Speak `text`, polling Select every tick. A Select press skips the
    /// rest of the narration at once.
    async fn narrate(&mut self, text: &str) -> Result<NarrationEnd, HardwareError> {
        self.stop_playback();

        let session = self.playback.start(text).await;
        if session.status() != PlaybackStatus::Running {
            return Ok(NarrationEnd::Failed);
        }
        self.active = Some(session);

        loop {
            let alive = self.active.as_mut().is_some_and(|s| s.poll_alive());
            if !alive {
                self.active = None;
                return Ok(NarrationEnd::Finished);
            }

            // skip
            match self.input.confirm_pressed().await {
                Ok(true) => {
                    self.stop_playback();
                    return Ok(NarrationEnd::Skipped);
                }
                Ok(false) => {}
                Err(e) => {
                    self.stop_playback();
                    return Err(e);
                }
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    fn stop_playback(&mut self) {
        if let Some(mut session) = self.active.take() {
            session.cancel();
        }
    }

    async fn show(&mut self, text: &str, hold: Option<Duration>) -> Result<(), HardwareError> {
        let frame = self.settings.layout.frame(text);
        self.display.render(&frame)?;
        if let Some(hold) = hold {
            tokio::time::sleep(hold).await;
        }
        Ok(())
    }
}
