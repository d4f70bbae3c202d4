//! NewsAPI top headlines and article download.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::extract;
use super::Article;
use crate::config::NewsConfig;
use crate::error::{FetchError, ParseError};

#[derive(Debug, Deserialize)]
struct TopHeadlines {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Headline>,
}

#[derive(Debug, Clone, Deserialize)]
struct Headline {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct NewsFetcher {
    config: NewsConfig,
    client: Client,
}

impl NewsFetcher {
    pub fn new(config: &NewsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("news-narrator/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config: config.clone(),
            client,
        }
    }

    /// Top headlines, then each article downloaded and parsed. Articles that
    /// fail are logged and skipped.
    pub async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        let headlines = self.headlines().await?;
        info!("Got {} headlines", headlines.len());

        let mut articles = Vec::with_capacity(headlines.len());
        for headline in &headlines {
            match self.download(headline).await {
                Ok(article) => {
                    debug!("Parsed '{}' from {} ({} chars)", article.title, article.url, article.text.len());
                    articles.push(article);
                }
                Err(e) => warn!("Article parse error: {e}"),
            }
        }
        Ok(articles)
    }

    async fn headlines(&self) -> Result<Vec<Headline>, FetchError> {
        if self.config.api_key.is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let page_size = self.config.page_size.to_string();
        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("country", self.config.country.as_str()),
                ("category", self.config.category.as_str()),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body: TopHeadlines = resp.json().await?;
        if !status.is_success() || body.status != "ok" {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: body.message.unwrap_or(body.status),
            });
        }
        Ok(body.articles)
    }

    async fn download(&self, headline: &Headline) -> Result<Article, ParseError> {
        let url = headline
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ParseError::MissingUrl)?;

        let download_err = |e: reqwest::Error| ParseError::Download {
            url: url.to_string(),
            message: e.to_string(),
        };

        let html = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(download_err)?
            .text()
            .await
            .map_err(download_err)?;

        parse_article(url, headline.title.as_deref(), &html)
    }
}

/// Build an `Article` from a downloaded page. The headline title wins over
/// the page `<title>`.
fn parse_article(url: &str, headline_title: Option<&str>, html: &str) -> Result<Article, ParseError> {
    let text = extract::article_text(html).ok_or_else(|| ParseError::NoText { url: url.to_string() })?;
    let title = headline_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| extract::page_title(html))
        .unwrap_or_else(|| "Untitled story".to_string());

    Ok(Article {
        title,
        text,
        url: url.to_string(),
    })
}
