//! News content pipeline: fetch headlines, parse articles, summarize per age.
//!
//! Components:
//! - `fetcher`: NewsAPI top headlines + article download
//! - `extract`: readable text from article HTML
//! - `summarizer`: age-adapted summaries via OpenAI or Ollama

pub mod extract;
pub mod fetcher;
pub mod summarizer;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{NewsConfig, SummarizerConfig};
use crate::error::{FetchError, SummarizationError};
use fetcher::NewsFetcher;
use summarizer::Summarizer;

/// Parsed source text, before summarization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// What the reader browses and hears. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub title: String,
    pub content: String,
}

impl Story {
    /// Cut `content` to `max_chars` characters, marking the cut with "...".
    pub fn truncated(mut self, max_chars: usize) -> Self {
        if self.content.chars().count() > max_chars {
            let mut cut: String = self.content.chars().take(max_chars).collect();
            cut.push_str("...");
            self.content = cut;
        }
        self
    }
}

#[async_trait]
pub trait ContentPipeline: Send + Sync {
    /// Fetch and parse articles. Articles that fail to parse are dropped.
    async fn fetch(&self) -> Result<Vec<Article>, FetchError>;

    async fn summarize(&self, article: &Article, age: u8) -> Result<Story, SummarizationError>;

    /// Summarize every article, dropping the ones that fail.
    async fn summarize_all(&self, articles: &[Article], age: u8) -> Vec<Story> {
        let mut stories = Vec::with_capacity(articles.len());
        for article in articles {
            match self.summarize(article, age).await {
                Ok(story) => stories.push(story),
                Err(e) => warn!("Summarization error for '{}': {e}", article.title),
            }
        }
        info!("Summarized {}/{} articles for age {age}", stories.len(), articles.len());
        stories
    }

    async fn fetch_and_summarize(&self, age: u8) -> Result<Vec<Story>, FetchError> {
        let articles = self.fetch().await?;
        Ok(self.summarize_all(&articles, age).await)
    }
}

/// NewsAPI + LLM summarizer.
pub struct NewsPipeline {
    fetcher: NewsFetcher,
    summarizer: Summarizer,
}

impl NewsPipeline {
    pub fn new(news: &NewsConfig, summarizer: &SummarizerConfig) -> Self {
        Self {
            fetcher: NewsFetcher::new(news),
            summarizer: Summarizer::new(summarizer),
        }
    }
}

#[async_trait]
impl ContentPipeline for NewsPipeline {
    async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        self.fetcher.fetch().await
    }

    async fn summarize(&self, article: &Article, age: u8) -> Result<Story, SummarizationError> {
        let content = self.summarizer.summarize(&article.text, age).await?;
        Ok(Story {
            title: article.title.clone(),
            content,
        })
    }
}
