//! Error types for news-narrator.
//!
//! Only `HardwareError` and `FetchError` end a session. Everything else is
//! per-article or per-narration and gets logged and absorbed by the caller.

use thiserror::Error;

/// The news endpoint could not be reached or returned garbage.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("News request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("News API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("News API key is not configured")]
    MissingApiKey,
}

/// One article could not be turned into readable text.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Article has no URL")]
    MissingUrl,

    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("No article text found at {url}")]
    NoText { url: String },
}

#[derive(Error, Debug)]
pub enum SummarizationError {
    #[error("Summarizer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Summarizer returned status {0}")]
    Status(u16),

    #[error("Summarizer returned an empty response")]
    Empty,
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Speech API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Nothing to speak")]
    EmptyText,

    #[error("Speech synthesis failed: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to start player `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Failed to start playback thread: {0}")]
    Thread(std::io::Error),

    #[error("Player command is empty")]
    EmptyCommand,

    #[error("Audio output unavailable: {0}")]
    Output(String),
}

/// Button or display failure. Always fatal to the session.
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unknown key name: {0}")]
    UnknownKey(String),

    #[error("Input read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("Display failed: {0}")]
    Display(String),
}

impl HardwareError {
    /// Short on-screen name of the failing part.
    pub fn part(&self) -> &'static str {
        match self {
            Self::Display(_) => "Display error",
            _ => "Button error",
        }
    }
}
