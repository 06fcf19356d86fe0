// src/config.rs
// Environment-backed configuration, resolved once per invocation and passed
// into the scraper explicitly. `.env` loading happens in main via dotenvy.

use std::env;

pub const DEFAULT_MAX_STORIES: usize = 100;
pub const DEFAULT_MIN_SCORE: i64 = 10;
pub const DEFAULT_MAX_TEXT_LEN: usize = 20_000;
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_DATABASE_PATH: &str = "hn_scraper.db";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Max candidate ids pulled from the feed per run (`HN_MAX_STORIES`).
    pub max_stories: usize,
    /// Stories below this score are skipped outright (`SCRAPE_MIN_SCORE`).
    pub min_score: i64,
    /// Lowercased keyword pre-filter; empty disables the gate (`KEYWORDS`).
    pub keywords: Vec<String>,
    /// Cap applied to extracted text before storage (`MAX_TEXT_LEN`).
    pub max_text_len: usize,
    /// Chat-completions model identifier (`OPENAI_MODEL`).
    pub model: String,
    pub openai_api_key: String,
    pub database_path: String,
    pub port: u16,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_stories: DEFAULT_MAX_STORIES,
            min_score: DEFAULT_MIN_SCORE,
            keywords: Vec::new(),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            model: DEFAULT_MODEL.to_string(),
            openai_api_key: String::new(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        Self {
            max_stories: env_parse("HN_MAX_STORIES", DEFAULT_MAX_STORIES),
            min_score: env_parse("SCRAPE_MIN_SCORE", DEFAULT_MIN_SCORE),
            keywords: parse_keywords(&env::var("KEYWORDS").unwrap_or_default()),
            max_text_len: env_parse("MAX_TEXT_LEN", DEFAULT_MAX_TEXT_LEN),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string()),
            port: env_parse("PORT", DEFAULT_PORT),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Split a comma-delimited keyword list, trimming and lowercasing entries.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
