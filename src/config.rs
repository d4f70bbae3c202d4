//! Configuration management for news-narrator.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults matching the reference device (two buttons, 128x64 OLED).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub endpoint: String,
    pub api_key: String,
    pub country: String,
    pub category: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://newsapi.org/v2/top-headlines".into(),
            api_key: String::new(),
            country: "us".into(),
            category: "general".into(),
            page_size: 5,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub backend: SummarizerBackend,
    pub model: String,
    /// Base URL. Empty picks the backend's usual endpoint.
    pub host: String,
    pub api_key: String,
    /// Summaries longer than this are cut to bound narration time.
    pub max_chars: usize,
    pub timeout_secs: u64,
}

impl SummarizerConfig {
    pub fn base_url(&self) -> &str {
        if !self.host.is_empty() {
            return self.host.trim_end_matches('/');
        }
        match self.backend {
            SummarizerBackend::OpenAi => "https://api.openai.com",
            SummarizerBackend::Ollama => "http://localhost:11434",
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::OpenAi,
            model: "gpt-4o-mini".into(),
            host: String::new(),
            api_key: String::new(),
            max_chars: 1000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    pub timeout_secs: u64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.elevenlabs.io/v1/text-to-speech".into(),
            api_key: String::new(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".into(),
            model_id: "eleven_multilingual_v2".into(),
            output_format: "mp3_44100_128".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerBackend {
    Rodio,
    Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub backend: PlayerBackend,
    /// Player argv for the `command` backend. Audio is written to its stdin.
    pub command: Vec<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backend: PlayerBackend::Rodio,
            command: vec!["mpg123".into(), "-q".into(), "-".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ButtonsConfig {
    /// evdev device path. Empty means: first device that has both keys.
    pub device: String,
    pub next_key: String,
    pub select_key: String,
    /// Names printed on the help screens.
    pub next_label: String,
    pub select_label: String,
    pub debounce_ms: u64,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            next_key: "KEY_N".into(),
            select_key: "KEY_ENTER".into(),
            next_label: "White".into(),
            select_label: "Blue".into(),
            debounce_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    Console,
    Notify,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub backend: DisplayBackend,
    pub width: u32,
    pub height: u32,
    pub line_height: u32,
    pub chars_per_line: usize,
    pub hold_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: DisplayBackend::Console,
            width: 128,
            height: 64,
            line_height: 13,
            chars_per_line: 20,
            hold_ms: 2000,
        }
    }
}

impl DisplayConfig {
    pub fn max_lines(&self) -> usize {
        (self.height / self.line_height.max(1)).max(1) as usize
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    pub fallback_age: u8,
    pub announce_age: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            fallback_age: 12,
            announce_age: true,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub news: NewsConfig,
    pub summarizer: SummarizerConfig,
    pub narration: NarrationConfig,
    pub playback: PlaybackConfig,
    pub buttons: ButtonsConfig,
    pub display: DisplayConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/news-narrator/config.yaml
    /// 3. /etc/news-narrator/config.yaml
    ///
    /// Empty API keys are filled from `NEWS_API_KEY`, `OPENAI_API_KEY` and
    /// `ELEVENLABS_API_KEY`.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Self::load_file(path);
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    fn load_file(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/news-narrator/config.yaml")),
                Some(PathBuf::from("/etc/news-narrator/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match serde_yml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let slots = [
            (&mut self.news.api_key, "NEWS_API_KEY"),
            (&mut self.summarizer.api_key, "OPENAI_API_KEY"),
            (&mut self.narration.api_key, "ELEVENLABS_API_KEY"),
        ];
        for (slot, var) in slots {
            if slot.is_empty() {
                if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                    *slot = value;
                }
            }
        }
    }
}
