// src/hn.rs
// Feed client for the Hacker News Firebase API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::models::HnItem;

pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Candidate feed seam. The scraper only talks to this trait so tests can
/// swap in a canned feed.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Up to `limit` item ids in the feed's current ranking order.
    ///
    /// Any upstream failure (network, non-2xx, malformed payload) is an
    /// error and fatal to the run — without ids there is nothing to do.
    async fn top_story_ids(&self, limit: usize) -> Result<Vec<u64>>;

    /// One item by id. A missing item is `Ok(None)`, not an error: the HN
    /// API answers `null` for unknown ids and that is a normal outcome.
    async fn fetch_item(&self, id: u64) -> Result<Option<HnItem>>;
}

pub struct HnClient {
    http: reqwest::Client,
    base_url: String,
}

impl HnClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(HN_API_BASE)
    }

    /// Base URL override, used by tests pointing at a local server.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hn-ai-scraper/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building hn http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Feed for HnClient {
    async fn top_story_ids(&self, limit: usize) -> Result<Vec<u64>> {
        let url = format!("{}/topstories.json", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("fetching top story ids")?;
        if !resp.status().is_success() {
            bail!("top stories endpoint returned {}", resp.status());
        }
        let mut ids: Vec<u64> = resp.json().await.context("decoding top story ids")?;
        ids.truncate(limit);
        Ok(ids)
    }

    async fn fetch_item(&self, id: u64) -> Result<Option<HnItem>> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching item {id}"))?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        // The API responds `null` for unknown ids.
        let item: Option<HnItem> = resp
            .json()
            .await
            .with_context(|| format!("decoding item {id}"))?;
        Ok(item)
    }
}
