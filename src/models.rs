// src/models.rs
// Data types shared across the pipeline and the read API.

use serde::{Deserialize, Serialize};

/// One item as returned by the Hacker News Firebase API.
///
/// Items are transient: fetched fresh each run and discarded unless they
/// survive the whole pipeline and become a [`Story`]. Fields are defaulted
/// so a sparse upstream payload still deserializes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HnItem {
    pub id: u64,
    /// "story", "job", "poll", "comment", ...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    /// Unix seconds of the original submission.
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub score: i64,
}

/// A story accepted by the pipeline, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub hn_id: i64,
    pub title: String,
    pub url: Option<String>,
    /// Extracted article text, already capped to the configured length.
    pub text: Option<String>,
    pub score: i64,
    pub by: Option<String>,
    pub time: Option<i64>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub summary: String,
    /// Comma-joined tag list.
    pub tags: String,
    pub relevance: f64,
    pub is_processed: bool,
}

/// A stored story row, as served by the read API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Story {
    pub id: i64,
    pub hn_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub text: Option<String>,
    pub score: i64,
    pub by: Option<String>,
    pub time: Option<i64>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<String>,
    pub relevance: Option<f64>,
    pub is_processed: bool,
    pub created_at: String,
}
