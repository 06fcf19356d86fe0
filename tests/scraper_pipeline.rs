// tests/scraper_pipeline.rs
//
// Pipeline behavior against mock feed/extractor/classifier seams and an
// in-memory store: filter ladder, failure isolation, idempotency, and the
// text cap. No sockets, no external services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use hn_ai_scraper::classify::{StoryClassifier, StoryVerdict};
use hn_ai_scraper::config::ScraperConfig;
use hn_ai_scraper::extract::TextExtractor;
use hn_ai_scraper::hn::Feed;
use hn_ai_scraper::models::HnItem;
use hn_ai_scraper::scraper::Scraper;
use hn_ai_scraper::store::StoryStore;

// ---- Mock seams -----------------------------------------------------------

struct MockFeed {
    ids: Vec<u64>,
    items: HashMap<u64, HnItem>,
    fail_listing: bool,
}

impl MockFeed {
    fn new(items: Vec<HnItem>) -> Self {
        let ids = items.iter().map(|i| i.id).collect();
        let items = items.into_iter().map(|i| (i.id, i)).collect();
        Self {
            ids,
            items,
            fail_listing: false,
        }
    }
}

#[async_trait]
impl Feed for MockFeed {
    async fn top_story_ids(&self, limit: usize) -> Result<Vec<u64>> {
        if self.fail_listing {
            bail!("upstream 503");
        }
        Ok(self.ids.iter().copied().take(limit).collect())
    }

    async fn fetch_item(&self, id: u64) -> Result<Option<HnItem>> {
        Ok(self.items.get(&id).cloned())
    }
}

struct RecordingExtractor {
    calls: Arc<AtomicUsize>,
    text: Option<String>,
}

#[async_trait]
impl TextExtractor for RecordingExtractor {
    async fn extract_text(&self, _url: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone()
    }
}

struct RecordingClassifier {
    calls: Arc<AtomicUsize>,
    verdict: Option<StoryVerdict>,
}

#[async_trait]
impl StoryClassifier for RecordingClassifier {
    async fn classify(
        &self,
        _title: &str,
        _url: Option<&str>,
        _text: Option<&str>,
    ) -> Option<StoryVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone()
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// ---- Fixtures -------------------------------------------------------------

fn story(id: u64, title: &str, score: i64, url: Option<&str>) -> HnItem {
    HnItem {
        id,
        kind: "story".to_string(),
        title: title.to_string(),
        url: url.map(str::to_string),
        by: Some("tester".to_string()),
        time: Some(1_700_000_000),
        score,
    }
}

fn related_verdict(relevance: f64) -> StoryVerdict {
    StoryVerdict {
        is_related: true,
        category: Some("Machine Learning".to_string()),
        subcategory: Some("LLM".to_string()),
        summary: "A relevant story.".to_string(),
        tags: "gpt,llm".to_string(),
        relevance,
    }
}

struct Harness {
    scraper: Scraper,
    store: Arc<StoryStore>,
    extractor_calls: Arc<AtomicUsize>,
    classifier_calls: Arc<AtomicUsize>,
}

fn harness(
    feed: MockFeed,
    extracted: Option<String>,
    verdict: Option<StoryVerdict>,
    config: ScraperConfig,
) -> Harness {
    let store = Arc::new(StoryStore::open_in_memory().expect("in-memory store"));
    let extractor_calls = Arc::new(AtomicUsize::new(0));
    let classifier_calls = Arc::new(AtomicUsize::new(0));
    let scraper = Scraper::new(
        Box::new(feed),
        Box::new(RecordingExtractor {
            calls: extractor_calls.clone(),
            text: extracted,
        }),
        Box::new(RecordingClassifier {
            calls: classifier_calls.clone(),
            verdict,
        }),
        store.clone(),
        config,
    );
    Harness {
        scraper,
        store,
        extractor_calls,
        classifier_calls,
    }
}

// ---- Tests ----------------------------------------------------------------

#[tokio::test]
async fn job_is_skipped_and_story_is_saved() {
    let mut job = story(1, "Hiring engineers", 100, None);
    job.kind = "job".to_string();
    let feed = MockFeed::new(vec![job, story(2, "LLM inference tricks", 30, None)]);
    let h = harness(feed, None, Some(related_verdict(0.9)), ScraperConfig::default());

    let summary = h.scraper.run_once(None).await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.saved, 1);

    // Item 1 never reached the classifier.
    assert_eq!(h.classifier_calls.load(Ordering::SeqCst), 1);
    assert!(h.store.get_by_hn_id(1).unwrap().is_none());

    let stored = h.store.get_by_hn_id(2).unwrap().expect("story 2 stored");
    assert_eq!(stored.relevance, Some(0.9));
    assert_eq!(stored.category.as_deref(), Some("Machine Learning"));
    assert!(stored.is_processed);
}

#[tokio::test]
async fn second_run_is_idempotent() {
    let feed = MockFeed::new(vec![story(10, "Vector databases compared", 40, None)]);
    let h = harness(feed, None, Some(related_verdict(0.8)), ScraperConfig::default());

    let first = h.scraper.run_once(None).await.unwrap();
    assert_eq!(first.saved, 1);

    let second = h.scraper.run_once(None).await.unwrap();
    assert_eq!(second.attempted, 1);
    assert_eq!(second.saved, 0, "already-stored ids must be skipped");
    assert_eq!(h.store.search(None, 10).unwrap().len(), 1);
    // The dedupe guard fires before classification on the second run.
    assert_eq!(h.classifier_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn low_score_items_never_reach_classification() {
    let feed = MockFeed::new(vec![story(3, "Tiny blog post about GPT", 5, None)]);
    let h = harness(feed, None, Some(related_verdict(0.9)), ScraperConfig::default());

    let summary = h.scraper.run_once(None).await.unwrap();
    assert_eq!(summary.saved, 0);
    assert_eq!(h.classifier_calls.load(Ordering::SeqCst), 0);
    assert!(h.store.search(None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn keyword_gate_blocks_low_scorers_and_spares_high_scorers() {
    let config = ScraperConfig {
        keywords: vec!["gpt".to_string()],
        ..ScraperConfig::default()
    };
    let feed = MockFeed::new(vec![
        story(1, "New database engine released", 20, Some("https://example.com/db")),
        story(2, "New database engine released", 60, Some("https://example.com/db")),
    ]);
    let h = harness(feed, None, Some(related_verdict(0.7)), config);

    let summary = h.scraper.run_once(None).await.unwrap();

    // Item 1 was filtered before extraction; item 2 bypassed the gate on score.
    assert_eq!(h.extractor_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.classifier_calls.load(Ordering::SeqCst), 1);
    assert_eq!(summary.saved, 1);
    assert!(h.store.get_by_hn_id(1).unwrap().is_none());
    assert!(h.store.get_by_hn_id(2).unwrap().is_some());
}

#[tokio::test]
async fn keyword_match_lets_low_scorers_through() {
    let config = ScraperConfig {
        keywords: vec!["gpt".to_string()],
        ..ScraperConfig::default()
    };
    let feed = MockFeed::new(vec![story(5, "GPT-5 fine-tuning notes", 20, None)]);
    let h = harness(feed, None, Some(related_verdict(0.95)), config);

    let summary = h.scraper.run_once(None).await.unwrap();
    assert_eq!(summary.saved, 1);
}

#[tokio::test]
async fn stored_text_is_capped() {
    let long_text = "x".repeat(25_000);
    let feed = MockFeed::new(vec![story(
        7,
        "Long article on transformers",
        40,
        Some("https://example.com/long"),
    )]);
    let h = harness(
        feed,
        Some(long_text),
        Some(related_verdict(0.9)),
        ScraperConfig::default(),
    );

    h.scraper.run_once(None).await.unwrap();
    let stored = h.store.get_by_hn_id(7).unwrap().expect("stored");
    assert_eq!(stored.text.expect("has text").chars().count(), 20_000);
}

#[tokio::test]
async fn classification_failure_skips_item_without_aborting_run() {
    let feed = MockFeed::new(vec![
        story(1, "First story", 30, None),
        story(2, "Second story", 30, None),
    ]);
    let h = harness(feed, None, None, ScraperConfig::default());

    let summary = h.scraper.run_once(None).await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.saved, 0);
    assert_eq!(h.classifier_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unrelated_verdict_is_rejected() {
    let verdict = StoryVerdict {
        is_related: false,
        relevance: 0.1,
        ..related_verdict(0.1)
    };
    let feed = MockFeed::new(vec![story(9, "Gardening tips", 80, None)]);
    let h = harness(feed, None, Some(verdict), ScraperConfig::default());

    let summary = h.scraper.run_once(None).await.unwrap();
    assert_eq!(summary.saved, 0);
    assert!(h.store.get_by_hn_id(9).unwrap().is_none());
}

#[tokio::test]
async fn missing_item_is_a_benign_skip() {
    let mut feed = MockFeed::new(vec![]);
    feed.ids = vec![404];
    let h = harness(feed, None, Some(related_verdict(0.9)), ScraperConfig::default());

    let summary = h.scraper.run_once(None).await.unwrap();
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.saved, 0);
}

#[tokio::test]
async fn feed_failure_aborts_the_run() {
    let mut feed = MockFeed::new(vec![story(1, "Never processed", 30, None)]);
    feed.fail_listing = true;
    let h = harness(feed, None, Some(related_verdict(0.9)), ScraperConfig::default());

    let err = h.scraper.run_once(None).await.unwrap_err();
    assert!(err.to_string().contains("hn feed unavailable"));
    assert!(h.store.search(None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn explicit_limit_overrides_config() {
    let feed = MockFeed::new(vec![
        story(1, "One", 30, None),
        story(2, "Two", 30, None),
        story(3, "Three", 30, None),
    ]);
    let h = harness(feed, None, Some(related_verdict(0.6)), ScraperConfig::default());

    let summary = h.scraper.run_once(Some(2)).await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.saved, 2);
    assert!(h.store.get_by_hn_id(3).unwrap().is_none());
}
