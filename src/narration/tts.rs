//! ElevenLabs text-to-speech client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use super::AudioClip;
use crate::config::NarrationConfig;
use crate::error::SynthesisError;

/// Turns text into playable audio.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError>;
}

pub struct ElevenLabsNarrator {
    config: NarrationConfig,
    client: Client,
}

impl ElevenLabsNarrator {
    pub fn new(config: &NarrationConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config: config.clone(),
            client,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/{}?output_format={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.voice_id,
            self.config.output_format
        )
    }
}

#[async_trait]
impl Narrator for ElevenLabsNarrator {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        if self.config.api_key.is_empty() {
            return Err(SynthesisError::Other("ElevenLabs API key is not configured".into()));
        }

        let t_start = Instant::now();
        let body = json!({
            "text": text,
            "model_id": self.config.model_id,
        });

        let resp = self
            .client
            .post(self.url())
            .header("xi-api-key", &self.config.api_key)
            .header("accept", "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let bytes = resp.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(SynthesisError::Other("speech API returned no audio".into()));
        }

        let latency_ms = t_start.elapsed().as_secs_f64() * 1000.0;
        info!("Synthesized {} chars → {} bytes ({latency_ms:.0}ms)", text.len(), bytes.len());
        debug!("Voice {} / model {}", self.config.voice_id, self.config.model_id);

        Ok(AudioClip::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_carries_voice_and_format() {
        let narrator = ElevenLabsNarrator::new(&NarrationConfig {
            endpoint: "https://api.elevenlabs.io/v1/text-to-speech/".into(),
            voice_id: "voice123".into(),
            ..NarrationConfig::default()
        });
        assert_eq!(
            narrator.url(),
            "https://api.elevenlabs.io/v1/text-to-speech/voice123?output_format=mp3_44100_128"
        );
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_before_any_request() {
        let narrator = ElevenLabsNarrator::new(&NarrationConfig::default());
        assert!(matches!(narrator.synthesize("  \n").await, Err(SynthesisError::EmptyText)));
    }

    #[tokio::test]
    async fn test_missing_key_is_a_synthesis_error() {
        let narrator = ElevenLabsNarrator::new(&NarrationConfig::default());
        assert!(matches!(narrator.synthesize("Hello").await, Err(SynthesisError::Other(_))));
    }
}
