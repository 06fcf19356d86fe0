// src/scraper.rs
// Pipeline orchestrator: one run pulls candidate ids from the feed and walks
// them sequentially through filter -> extract -> classify -> store. Failures
// are isolated per item; only an unavailable feed aborts the run.

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::classify::{truncate_chars, StoryClassifier};
use crate::config::ScraperConfig;
use crate::extract::TextExtractor;
use crate::hn::Feed;
use crate::models::{HnItem, NewStory};
use crate::store::{StoreError, StoryStore};

/// Items at or above this score bypass the keyword pre-filter; below it the
/// filter protects the classification-call budget.
pub const KEYWORD_BYPASS_SCORE: i64 = 50;

/// One-time metrics registration (so series show up with descriptions).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scrape_items_attempted_total",
            "Candidate ids attempted by the pipeline."
        );
        describe_counter!(
            "scrape_items_saved_total",
            "Stories accepted and inserted into the store."
        );
        describe_counter!(
            "scrape_items_skipped_total",
            "Candidates filtered out, rejected, or failed."
        );
        describe_counter!(
            "scrape_classify_failures_total",
            "Classification calls that produced no usable verdict."
        );
    });
}

/// Final counts for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub saved: usize,
}

pub struct Scraper {
    feed: Box<dyn Feed>,
    extractor: Box<dyn TextExtractor>,
    classifier: Box<dyn StoryClassifier>,
    store: Arc<StoryStore>,
    config: ScraperConfig,
}

impl Scraper {
    pub fn new(
        feed: Box<dyn Feed>,
        extractor: Box<dyn TextExtractor>,
        classifier: Box<dyn StoryClassifier>,
        store: Arc<StoryStore>,
        config: ScraperConfig,
    ) -> Self {
        Self {
            feed,
            extractor,
            classifier,
            store,
            config,
        }
    }

    /// Run the pipeline once. `limit` overrides the configured candidate
    /// count. Safe to re-run: already-stored ids are skipped, so a second
    /// run over an unchanged feed saves nothing.
    pub async fn run_once(&self, limit: Option<usize>) -> Result<RunSummary> {
        ensure_metrics_described();
        let limit = limit.unwrap_or(self.config.max_stories);
        info!(
            limit,
            min_score = self.config.min_score,
            classifier = self.classifier.name(),
            "starting scrape run"
        );

        // No ids, no run. This is the only fatal failure.
        let ids = self
            .feed
            .top_story_ids(limit)
            .await
            .context("hn feed unavailable")?;
        info!(count = ids.len(), "fetched top story ids");

        let mut summary = RunSummary::default();
        for id in ids {
            summary.attempted += 1;
            counter!("scrape_items_attempted_total").increment(1);
            match self.process_item(id).await {
                Ok(true) => {
                    summary.saved += 1;
                    counter!("scrape_items_saved_total").increment(1);
                }
                Ok(false) => {
                    counter!("scrape_items_skipped_total").increment(1);
                }
                Err(e) => {
                    // Per-item isolation: log and keep walking the feed.
                    warn!(hn_id = id, error = ?e, "item failed, continuing run");
                    counter!("scrape_items_skipped_total").increment(1);
                }
            }
        }

        info!(
            attempted = summary.attempted,
            saved = summary.saved,
            "scrape run finished"
        );
        Ok(summary)
    }

    /// Returns `Ok(true)` when the item was stored, `Ok(false)` for any
    /// filtered/rejected/benign-duplicate outcome.
    async fn process_item(&self, id: u64) -> Result<bool> {
        let Some(item) = self.feed.fetch_item(id).await? else {
            debug!(hn_id = id, "item not found upstream");
            return Ok(false);
        };

        if item.kind != "story" {
            debug!(hn_id = id, kind = %item.kind, "not a story");
            return Ok(false);
        }
        if item.score < self.config.min_score {
            debug!(hn_id = id, score = item.score, "below score threshold");
            return Ok(false);
        }
        if self.store.exists(id as i64)? {
            debug!(hn_id = id, "already stored");
            return Ok(false);
        }
        if !self.passes_keyword_gate(&item) {
            debug!(hn_id = id, score = item.score, "no keyword match");
            return Ok(false);
        }

        // Extraction failure is non-fatal; classification still gets the
        // title and url.
        let text = match item.url.as_deref() {
            Some(url) => self.extractor.extract_text(url).await,
            None => None,
        };
        if let Some(t) = &text {
            debug!(hn_id = id, chars = t.chars().count(), "extracted article text");
        }

        let Some(verdict) = self
            .classifier
            .classify(&item.title, item.url.as_deref(), text.as_deref())
            .await
        else {
            warn!(hn_id = id, "classification failed, skipping item");
            counter!("scrape_classify_failures_total").increment(1);
            return Ok(false);
        };

        if !verdict.is_related {
            info!(
                hn_id = id,
                relevance = verdict.relevance,
                "rejected as unrelated"
            );
            return Ok(false);
        }

        let text = text.map(|t| truncate_chars(t, self.config.max_text_len));
        let story = NewStory {
            hn_id: id as i64,
            title: item.title.clone(),
            url: item.url,
            text,
            score: item.score,
            by: item.by,
            time: item.time,
            category: verdict.category,
            subcategory: verdict.subcategory,
            summary: verdict.summary,
            tags: verdict.tags,
            relevance: verdict.relevance,
            is_processed: true,
        };

        match self.store.insert(&story) {
            Ok(()) => {
                info!(
                    hn_id = id,
                    relevance = story.relevance,
                    title = %item.title,
                    "saved story"
                );
                Ok(true)
            }
            // A concurrent run won the race; the row exists, which is fine.
            Err(StoreError::Duplicate(_)) => {
                debug!(hn_id = id, "inserted by a concurrent run");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Keyword gate: with no configured keywords everything passes; high
    /// scorers bypass the check entirely.
    fn passes_keyword_gate(&self, item: &HnItem) -> bool {
        self.config.keywords.is_empty()
            || item.score >= KEYWORD_BYPASS_SCORE
            || matches_keywords(&self.config.keywords, &item.title, item.url.as_deref())
    }
}

/// Case-insensitive substring match of any keyword against title or url.
/// Keywords are expected lowercased (see `config::parse_keywords`).
pub fn matches_keywords(keywords: &[String], title: &str, url: Option<&str>) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = format!("{} {}", title, url.unwrap_or("")).to_lowercase();
    keywords.iter().any(|k| haystack.contains(k.as_str()))
}
