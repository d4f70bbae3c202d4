//! Scripted stand-ins for buttons, news, speech, playback and display.
//!
//! All fakes report into a shared `Stage` so tests can assert on what was
//! shown, launched, cancelled and completed. Playback length is measured on
//! tokio's clock, so tests run with `start_paused = true`.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::buttons::{ButtonPins, Control, InputSource};
use crate::display::{DisplaySink, Frame};
use crate::error::{FetchError, HardwareError, PlaybackError, SummarizationError, SynthesisError};
use crate::narration::playback::PlaybackTask;
use crate::narration::player::{PlaybackUnit, Player};
use crate::narration::tts::Narrator;
use crate::narration::AudioClip;
use crate::news::{Article, ContentPipeline, Story};
use crate::session::Collaborators;

#[derive(Default)]
struct StageLog {
    frames: Vec<Frame>,
    launched: Vec<String>,
    cancelled: Vec<String>,
    completed: Vec<String>,
    live: usize,
    max_live: usize,
    cleared: bool,
    display_broken: bool,
}

/// Shared record of everything the fakes saw.
#[derive(Default)]
pub struct Stage {
    log: Mutex<StageLog>,
}

impl Stage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn log(&self) -> MutexGuard<'_, StageLog> {
        self.log.lock().unwrap()
    }

    pub fn launched(&self) -> Vec<String> {
        self.log().launched.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.log().cancelled.clone()
    }

    pub fn completed(&self) -> Vec<String> {
        self.log().completed.clone()
    }

    pub fn live(&self) -> usize {
        self.log().live
    }

    pub fn max_live(&self) -> usize {
        self.log().max_live
    }

    pub fn cleared(&self) -> bool {
        self.log().cleared
    }

    /// Every render from now on fails.
    pub fn break_display(&self) {
        self.log().display_broken = true;
    }

    pub fn last_frame(&self) -> Option<String> {
        self.log().frames.last().map(Frame::text)
    }

    /// Wire a full set of fakes around this stage.
    pub fn collaborators(
        self: &Arc<Self>,
        pipeline: FakePipeline,
        script: Vec<Press>,
        failing_speech: &[&str],
        play_for: Duration,
    ) -> Collaborators {
        Collaborators {
            input: InputSource::new(
                Box::new(ScriptedPins::new(self.clone(), script)),
                Duration::from_millis(50),
            ),
            pipeline: Box::new(pipeline),
            playback: PlaybackTask::new(
                Box::new(FakeNarrator::new(failing_speech)),
                Box::new(FakePlayer::new(self.clone(), play_for)),
            ),
            display: Box::new(FakeDisplay { stage: self.clone() }),
        }
    }
}

/// When a scripted press becomes visible to the controller.
#[derive(Debug, Clone)]
enum Gate {
    /// The current screen contains this text.
    Showing(String),
    /// This text is the narration currently playing.
    Narrating(String),
}

/// One scripted press-and-release.
#[derive(Debug, Clone)]
pub struct Press {
    control: Control,
    gate: Option<Gate>,
}

pub fn press(control: Control) -> Press {
    Press { control, gate: None }
}

impl Press {
    pub fn when_showing(mut self, text: &str) -> Self {
        self.gate = Some(Gate::Showing(text.to_string()));
        self
    }

    pub fn when_narrating(mut self, text: &str) -> Self {
        self.gate = Some(Gate::Narrating(text.to_string()));
        self
    }
}

/// Plays back a press script in order. Each press reads as held once, then
/// released. Reading past the end of the script is a hardware error, which
/// ends the session.
pub struct ScriptedPins {
    stage: Arc<Stage>,
    script: VecDeque<Press>,
    held: bool,
}

impl ScriptedPins {
    pub fn new(stage: Arc<Stage>, script: Vec<Press>) -> Self {
        Self {
            stage,
            script: script.into(),
            held: false,
        }
    }

    fn gate_open(&self, gate: &Gate) -> bool {
        let log = self.stage.log();
        match gate {
            Gate::Showing(text) => log.frames.last().is_some_and(|f| f.text().contains(text.as_str())),
            Gate::Narrating(text) => log.live > 0 && log.launched.last() == Some(text),
        }
    }
}

impl ButtonPins for ScriptedPins {
    fn is_pressed(&mut self, control: Control) -> Result<bool, HardwareError> {
        let Some(next) = self.script.front() else {
            return Err(HardwareError::Read(std::io::Error::other("input script exhausted")));
        };
        if next.control != control {
            return Ok(false);
        }
        if self.held {
            self.held = false;
            self.script.pop_front();
            return Ok(false);
        }
        if next.gate.as_ref().is_some_and(|g| !self.gate_open(g)) {
            return Ok(false);
        }
        self.held = true;
        Ok(true)
    }
}

pub struct FakePipeline {
    articles: Vec<Article>,
    failing: HashSet<String>,
    reachable: bool,
}

impl FakePipeline {
    pub fn with_titles(titles: &[&str]) -> Self {
        let articles = titles
            .iter()
            .map(|t| Article {
                title: t.to_string(),
                text: format!("{t} text"),
                url: format!("https://news.example/{}", t.to_lowercase()),
            })
            .collect();
        Self {
            articles,
            failing: HashSet::new(),
            reachable: true,
        }
    }

    pub fn failing_on(mut self, titles: &[&str]) -> Self {
        self.failing = titles.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn with_text_len(mut self, len: usize) -> Self {
        for article in &mut self.articles {
            article.text = "x".repeat(len);
        }
        self
    }
}

#[async_trait]
impl ContentPipeline for FakePipeline {
    async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        if !self.reachable {
            return Err(FetchError::MissingApiKey);
        }
        Ok(self.articles.clone())
    }

    async fn summarize(&self, article: &Article, age: u8) -> Result<Story, SummarizationError> {
        if self.failing.contains(&article.title) {
            return Err(SummarizationError::Empty);
        }
        Ok(Story {
            title: article.title.clone(),
            content: format!("Summary for age {age}: {}", article.text),
        })
    }
}

/// Encodes the text itself as the "audio".
pub struct FakeNarrator {
    failing: HashSet<String>,
}

impl FakeNarrator {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Narrator for FakeNarrator {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError> {
        if self.failing.contains(text) {
            return Err(SynthesisError::Other(format!("refused: {text}")));
        }
        Ok(AudioClip::new(text.as_bytes().to_vec()))
    }
}

/// Every clip "plays" for a fixed time on tokio's clock.
pub struct FakePlayer {
    stage: Arc<Stage>,
    play_for: Duration,
    fail: bool,
}

impl FakePlayer {
    pub fn new(stage: Arc<Stage>, play_for: Duration) -> Self {
        Self {
            stage,
            play_for,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn launch(&self, clip: AudioClip) -> Result<Box<dyn PlaybackUnit>, PlaybackError> {
        if self.fail {
            return Err(PlaybackError::Output("no speaker".into()));
        }
        let text = String::from_utf8_lossy(&clip.bytes).into_owned();
        {
            let mut log = self.stage.log();
            log.launched.push(text.clone());
            log.live += 1;
            log.max_live = log.max_live.max(log.live);
        }
        Ok(Box::new(FakeUnit {
            stage: self.stage.clone(),
            text,
            ends_at: Instant::now() + self.play_for,
            reaped: false,
        }))
    }
}

struct FakeUnit {
    stage: Arc<Stage>,
    text: String,
    ends_at: Instant,
    reaped: bool,
}

impl PlaybackUnit for FakeUnit {
    fn is_alive(&mut self) -> bool {
        !self.reaped && Instant::now() < self.ends_at
    }

    fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        self.reaped = true;
        let mut log = self.stage.log();
        log.live -= 1;
        if Instant::now() < self.ends_at {
            log.cancelled.push(self.text.clone());
        } else {
            log.completed.push(self.text.clone());
        }
    }
}

struct FakeDisplay {
    stage: Arc<Stage>,
}

impl DisplaySink for FakeDisplay {
    fn render(&mut self, frame: &Frame) -> Result<(), HardwareError> {
        let mut log = self.stage.log();
        if log.display_broken {
            return Err(HardwareError::Display("panel not responding".into()));
        }
        log.frames.push(frame.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), HardwareError> {
        self.stage.log().cleared = true;
        Ok(())
    }
}
