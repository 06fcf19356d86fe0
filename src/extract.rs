// src/extract.rs
// Article text extraction: a structured main-content pass with a
// paragraph-scrape fallback, sharing one minimum-length acceptance gate.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

/// Browser-like UA so article hosts serve the regular page.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Results at or below this trimmed length count as extraction failure,
/// not as valid short content.
pub const MIN_TEXT_LEN: usize = 100;

/// Extraction seam for the scraper. Implementations never raise: every
/// failure degrades to `None` and the pipeline proceeds without text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, url: &str) -> Option<String>;
}

pub struct ArticleExtractor {
    http: reqwest::Client,
}

impl ArticleExtractor {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building extractor http client")?;
        Ok(Self { http })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let resp = self.http.get(url).send().await.context("fetching page")?;
        if !resp.status().is_success() {
            bail!("page returned {}", resp.status());
        }
        resp.text().await.context("reading page body")
    }
}

#[async_trait]
impl TextExtractor for ArticleExtractor {
    async fn extract_text(&self, url: &str) -> Option<String> {
        if url.is_empty() {
            return None;
        }
        // Primary: structured main-content extraction.
        match self.fetch_html(url).await {
            Ok(html) => {
                if let Some(text) = main_content_text(&html) {
                    return Some(text);
                }
                debug!(url, "main-content extraction failed, trying paragraph fallback");
            }
            Err(e) => {
                debug!(url, error = ?e, "article fetch failed, trying paragraph fallback");
            }
        }
        // Fallback: fresh raw fetch, paragraph scrape.
        match self.fetch_html(url).await {
            Ok(html) => paragraph_text(&html),
            Err(e) => {
                debug!(url, error = ?e, "fallback fetch failed");
                None
            }
        }
    }
}

/// Shared acceptance predicate for both strategies.
fn accept(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.len() > MIN_TEXT_LEN {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Drop non-content subtrees before text collection.
fn strip_chrome(html: &str) -> String {
    let doc = Html::parse_document(html);
    let chrome_sel = Selector::parse("script, style, nav, header, footer, aside").unwrap();

    let mut result = html.to_string();
    for el in doc.select(&chrome_sel) {
        let outer = el.html();
        result = result.replace(&outer, "");
    }
    result
}

/// Primary strategy: readability heuristics over common main-content
/// containers, first match wins.
pub(crate) fn main_content_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(&strip_chrome(html));
    let selectors = ["article", "main", r#"[role="main"]"#, ".content"];

    for sel_str in selectors {
        let sel = Selector::parse(sel_str).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            let text = el
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if let Some(accepted) = accept(text) {
                return Some(accepted);
            }
        }
    }
    None
}

/// Fallback strategy: concatenate the text of every paragraph element left
/// after chrome stripping.
pub(crate) fn paragraph_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(&strip_chrome(html));
    let p_sel = Selector::parse("p").unwrap();

    let paragraphs = doc
        .select(&p_sel)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();
    accept(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_body() -> String {
        "Large language models keep getting better at code generation. ".repeat(4)
    }

    #[test]
    fn article_tag_wins_when_long_enough() {
        let html = format!(
            "<html><body><nav>Menu Menu Menu</nav><article><p>{}</p></article></body></html>",
            long_body()
        );
        let text = main_content_text(&html).expect("should extract article");
        assert!(text.contains("Large language models"));
        assert!(!text.contains("Menu"));
    }

    #[test]
    fn short_main_content_is_rejected() {
        // 80 characters of body: below the acceptance floor.
        let short = "a".repeat(80);
        let html = format!("<html><body><article>{short}</article></body></html>");
        assert_eq!(main_content_text(&html), None);
    }

    #[test]
    fn short_fallback_is_rejected_too() {
        let short = "b".repeat(80);
        let html = format!("<html><body><p>{short}</p></body></html>");
        assert_eq!(paragraph_text(&html), None);
    }

    #[test]
    fn fallback_joins_paragraphs_and_skips_chrome() {
        let half = "c".repeat(60);
        let html = format!(
            "<html><body><header><p>skip me</p></header><div><p>{half}</p><p>{half}</p></div></body></html>"
        );
        let text = paragraph_text(&html).expect("two paragraphs clear the floor");
        assert!(!text.contains("skip me"));
        assert_eq!(text, format!("{half}\n{half}"));
    }

    #[test]
    fn script_text_is_not_content() {
        let html = format!(
            "<html><body><article><script>var x = 1;</script><p>{}</p></article></body></html>",
            long_body()
        );
        let text = main_content_text(&html).unwrap();
        assert!(!text.contains("var x"));
    }
}
