//! Age-adapted article summaries.
//!
//! Talks to either the OpenAI chat completions API or a local Ollama
//! `/api/generate` endpoint. No fallback text: a failed summary drops the
//! article.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{SummarizerBackend, SummarizerConfig};
use crate::error::SummarizationError;

const SUMMARIZE_PROMPT: &str = "Summarize for a {age}-year-old in a fun and exciting way:\n\n{content}";

/// Long articles are cut before prompting to keep requests small.
const MAX_INPUT_CHARS: usize = 12_000;

pub struct Summarizer {
    config: SummarizerConfig,
    client: Client,
}

impl Summarizer {
    pub fn new(config: &SummarizerConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config: config.clone(),
            client,
        }
    }

    pub async fn summarize(&self, text: &str, age: u8) -> Result<String, SummarizationError> {
        let t_start = Instant::now();
        let prompt = build_prompt(text, age);

        let request = match self.config.backend {
            SummarizerBackend::OpenAi => self.openai_request(&prompt),
            SummarizerBackend::Ollama => self.ollama_request(&prompt),
        };

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(SummarizationError::Status(resp.status().as_u16()));
        }
        let data: Value = resp.json().await?;
        let summary = extract_summary(self.config.backend, &data).ok_or(SummarizationError::Empty)?;

        let latency_ms = t_start.elapsed().as_secs_f64() * 1000.0;
        info!("Summarized {} chars → {} chars ({latency_ms:.0}ms)", text.len(), summary.len());
        Ok(summary)
    }

    fn openai_request(&self, prompt: &str) -> RequestBuilder {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        debug!("Sending to OpenAI model '{}'", self.config.model);
        self.client.post(url).bearer_auth(&self.config.api_key).json(&json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        }))
    }

    fn ollama_request(&self, prompt: &str) -> RequestBuilder {
        let url = format!("{}/api/generate", self.config.base_url());
        debug!("Sending to Ollama model '{}'", self.config.model);
        self.client.post(url).json(&json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.7,
                "num_predict": 400
            }
        }))
    }
}

fn build_prompt(text: &str, age: u8) -> String {
    let input: String = text.chars().take(MAX_INPUT_CHARS).collect();
    SUMMARIZE_PROMPT
        .replace("{age}", &age.to_string())
        .replace("{content}", &input)
}

fn extract_summary(backend: SummarizerBackend, data: &Value) -> Option<String> {
    let raw = match backend {
        SummarizerBackend::OpenAi => data["choices"][0]["message"]["content"].as_str(),
        SummarizerBackend::Ollama => data["response"].as_str(),
    }?;
    let summary = raw.trim();
    (!summary.is_empty()).then(|| summary.to_string())
}
