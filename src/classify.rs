// src/classify.rs
// Story classification via an external chat-completions service.
//
// The upstream model is not contractually bound to the response schema, so
// everything funnels through strict post-parse validation: either a fully
// populated verdict comes back, or `None`. No partially-filled output.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Extracted text is cut to this many characters before prompting, to
/// respect upstream payload limits.
pub const MAX_PROMPT_TEXT_LEN: usize = 5000;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a technical content analyst specializing in AI and technology topics. Always respond with valid JSON.";

/// Fully-validated classification result for one story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryVerdict {
    pub is_related: bool,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub summary: String,
    /// Comma-joined, normalized from the upstream tag array.
    pub tags: String,
    /// Clamped to [0, 1].
    pub relevance: f64,
}

/// Classifier seam for the scraper. `None` covers every failure mode:
/// upstream call error, malformed JSON, missing keys.
#[async_trait]
pub trait StoryClassifier: Send + Sync {
    async fn classify(
        &self,
        title: &str,
        url: Option<&str>,
        text: Option<&str>,
    ) -> Option<StoryVerdict>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hn-ai-scraper/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building openai http client")?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    async fn request_completion(&self, prompt: &str) -> Option<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        // Zero temperature: identical input should classify identically.
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            max_tokens: 512,
        };

        let resp = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "classification call failed");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        body.choices.into_iter().next().map(|c| c.message.content)
    }
}

#[async_trait]
impl StoryClassifier for OpenAiClassifier {
    async fn classify(
        &self,
        title: &str,
        url: Option<&str>,
        text: Option<&str>,
    ) -> Option<StoryVerdict> {
        if title.trim().is_empty() {
            return None;
        }
        if self.api_key.is_empty() {
            warn!("no OPENAI_API_KEY configured, skipping classification");
            return None;
        }

        let prompt = build_prompt(title, url, text);
        let raw = self.request_completion(&prompt).await?;
        let verdict = parse_verdict(&raw);
        if verdict.is_none() {
            debug!(response = %raw, "could not parse classification response");
        }
        verdict
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Fixed-output classifier for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MockClassifier {
    pub verdict: Option<StoryVerdict>,
}

#[async_trait]
impl StoryClassifier for MockClassifier {
    async fn classify(
        &self,
        _title: &str,
        _url: Option<&str>,
        _text: Option<&str>,
    ) -> Option<StoryVerdict> {
        self.verdict.clone()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn build_prompt(title: &str, url: Option<&str>, text: Option<&str>) -> String {
    let mut context = format!("Title: {title}\n");
    if let Some(url) = url {
        context.push_str(&format!("URL: {url}\n"));
    }
    if let Some(text) = text {
        let text = truncate_chars(text.to_string(), MAX_PROMPT_TEXT_LEN);
        context.push_str(&format!("Content: {text}\n"));
    }

    format!(
        "Analyze the following Hacker News story and determine if it's related to AI, \
machine learning, or related technologies.\n\n{context}\n\
Provide your analysis in strict JSON format with these exact keys:\n\
- is_related: boolean (true if related to AI/ML/tech, false otherwise)\n\
- category: string or null (e.g., \"Machine Learning\", \"Artificial Intelligence\", \"Software Development\", \"Hardware\", etc.)\n\
- subcategory: string or null (e.g., \"LLM\", \"Computer Vision\", \"DevOps\", \"Cloud\", etc.)\n\
- summary: string (2-3 sentence summary)\n\
- tags: array of strings (relevant tags like [\"gpt\", \"neural-networks\", \"python\"])\n\
- relevance: float between 0 and 1 (how relevant is this to AI/ML)\n\n\
Return ONLY valid JSON, no additional text."
    )
}

/// Truncate to at most `max` characters, on a char boundary.
pub fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s,
    }
}

/// Locate the first well-formed JSON object embedded in free-form text.
/// Tolerates fenced code blocks and surrounding prose.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

const REQUIRED_KEYS: [&str; 6] = [
    "is_related",
    "category",
    "subcategory",
    "summary",
    "tags",
    "relevance",
];

/// Parse the raw model response into a verdict. Returns `None` on any
/// missing key or type mismatch — never a partially-populated verdict.
pub fn parse_verdict(raw: &str) -> Option<StoryVerdict> {
    let json = extract_json_object(raw)?;
    let value: Value = serde_json::from_str(json).ok()?;
    let obj = value.as_object()?;

    if REQUIRED_KEYS.iter().any(|k| !obj.contains_key(*k)) {
        return None;
    }

    let is_related = obj["is_related"].as_bool()?;
    let category = nullable_string(&obj["category"])?;
    let subcategory = nullable_string(&obj["subcategory"])?;
    let summary = obj["summary"].as_str()?.to_string();
    let tags = obj["tags"]
        .as_array()?
        .iter()
        .map(|v| v.as_str())
        .collect::<Option<Vec<_>>>()?
        .join(",");
    let relevance = obj["relevance"].as_f64()?.clamp(0.0, 1.0);

    Some(StoryVerdict {
        is_related,
        category,
        subcategory,
        summary,
        tags,
        relevance,
    })
}

/// `null` maps to `None`, a string to `Some`; any other type is a schema
/// violation.
fn nullable_string(v: &Value) -> Option<Option<String>> {
    match v {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}
