use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;

use crate::error::FetchError;

/// One syndication entry, reduced to what the aggregator uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineItem {
    pub title: String,
    pub link: Option<String>,
}

/// Anything that can turn a feed URL into headlines.
///
/// Implementations never fail: a broken source yields an empty list.
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Vec<HeadlineItem>;
}

/// Fetches and parses RSS/Atom feeds over HTTP, one attempt per call.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }

    pub fn from_config(config: &common::FetchConfig) -> Result<Self> {
        Self::new(config.timeout_seconds, &config.user_agent)
    }

    /// Fetch a feed and return its headlines, surfacing the failure cause.
    pub async fn try_fetch(&self, url: &str) -> Result<Vec<HeadlineItem>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        parse_headlines(bytes.as_ref())
    }
}

#[async_trait]
impl HeadlineSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> Vec<HeadlineItem> {
        match self.try_fetch(url).await {
            Ok(items) => {
                tracing::debug!(url, count = items.len(), "fetched feed");
                items
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "RSS fetch/parse failed");
                Vec::new()
            }
        }
    }
}

/// Parse a feed document into headlines, in document order.
///
/// A channel with one `<item>` yields one headline and a channel without
/// items yields none. Entries without a usable title are skipped.
pub fn parse_headlines(body: &[u8]) -> Result<Vec<HeadlineItem>, FetchError> {
    let feed = parser::parse(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content.trim().to_string())?;
            if title.is_empty() {
                return None;
            }
            Some(HeadlineItem {
                title,
                link: entry.links.into_iter().next().map(|l| l.href),
            })
        })
        .collect();

    Ok(items)
}
