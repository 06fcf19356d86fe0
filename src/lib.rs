// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod classify;
pub mod config;
pub mod extract;
pub mod hn;
pub mod models;
pub mod scraper;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::classify::{MockClassifier, StoryClassifier, StoryVerdict};
pub use crate::config::ScraperConfig;
pub use crate::scraper::{RunSummary, Scraper};
pub use crate::store::{StoreError, StoryStore};
