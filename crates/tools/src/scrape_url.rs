//! Web scraping tool: fetch a page, reduce it to text, store it for retrieval.

use async_trait::async_trait;
use regex_lite::Regex;
use std::sync::{Arc, LazyLock};
use steward_core::error::ToolError;
use steward_core::tool::{Tool, ToolResult};
use tracing::{info, warn};

use crate::retrieval_store::{DEFAULT_WORKSPACE, RetrievalStore};

const MAX_STORED_CHARS: usize = 200_000;
const PREVIEW_CHARS: usize = 500;

pub struct ScrapeUrlTool {
    store: Arc<RetrievalStore>,
    client: reqwest::Client,
}

impl ScrapeUrlTool {
    pub fn new(store: Arc<RetrievalStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent(concat!("steward/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { store, client }
    }

    async fn fetch(&self, url: &reqwest::Url) -> Result<String, String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {} fetching {url}", status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| format!("Failed to read body: {e}"))
    }
}

#[async_trait]
impl Tool for ScrapeUrlTool {
    fn name(&self) -> &str {
        "scrape_url"
    }

    fn description(&self) -> &str {
        "Scrape a web page and save its text content to a retrieval workspace so it can be searched later with search_information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The http(s) URL to scrape"
                },
                "workspace_id": {
                    "type": "string",
                    "description": "Workspace to store the page in (default: \"default\")"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let raw_url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;
        let workspace_id = arguments["workspace_id"].as_str().unwrap_or(DEFAULT_WORKSPACE);

        let url = match reqwest::Url::parse(raw_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            Ok(u) => {
                return Ok(error_result(format!("Unsupported URL scheme '{}'", u.scheme())));
            }
            Err(e) => return Ok(error_result(format!("Invalid URL '{raw_url}': {e}"))),
        };

        info!(url = %url, workspace = workspace_id, "Scraping URL");

        let html = match self.fetch(&url).await {
            Ok(body) => body,
            Err(message) => {
                warn!(url = %url, %message, "Scrape failed");
                return Ok(error_result(message));
            }
        };

        let title = extract_title(&html).unwrap_or_else(|| url.to_string());
        let mut text = html_to_text(&html);
        if let Some((cut, _)) = text.char_indices().nth(MAX_STORED_CHARS) {
            text.truncate(cut);
        }
        if text.is_empty() {
            return Ok(error_result(format!("No readable text found at {url}")));
        }

        let doc = match self
            .store
            .add_document(workspace_id, url.as_str(), &title, &text)
            .await
        {
            Ok(doc) => doc,
            Err(e) => return Ok(error_result(e.to_string())),
        };

        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        Ok(ToolResult::json(serde_json::json!({
            "status": "success",
            "workspace_id": workspace_id,
            "url": url.as_str(),
            "title": title,
            "document_id": doc.id,
            "content_length": text.len(),
            "preview": preview,
        })))
    }
}

fn error_result(message: String) -> ToolResult {
    ToolResult::json(serde_json::json!({ "status": "error", "message": message }))
}

const HIDDEN_TAGS: [&str; 5] = ["script", "style", "noscript", "head", "svg"];

static COMMENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").ok());
static HIDDEN: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    HIDDEN_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}>")).ok())
        .collect()
});
static LINE_BREAK: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").ok());
static BLOCK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(p|div|section|article|h[1-6]|li|ul|ol|tr|table|blockquote|pre|header|footer)\b[^>]*>",
    )
    .ok()
});
static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());
static TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok());

fn replace(re: &Option<Regex>, text: &str, with: &str) -> String {
    match re {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// The page `<title>`, whitespace-collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE.as_ref()?.captures(html)?.get(1)?.as_str();
    let title = collapse_whitespace(&decode_entities(raw));
    (!title.is_empty()).then_some(title)
}

/// Strip markup down to readable paragraphs.
pub fn html_to_text(html: &str) -> String {
    let mut text = replace(&COMMENT, html, " ");
    for re in HIDDEN.iter() {
        text = re.replace_all(&text, " ").into_owned();
    }
    text = replace(&LINE_BREAK, &text, "\n");
    text = replace(&BLOCK, &text, "\n\n");
    text = replace(&TAG, &text, " ");
    let text = decode_entities(&text);

    text.split("\n\n")
        .map(collapse_whitespace)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
