//! File-backed document store for retrieval workspaces.
//!
//! Layout: `<root>/<workspace_id>/docs/<document_id>.json`. Documents are
//! split into paragraph chunks at query time and ranked by keyword overlap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_WORKSPACE: &str = "default";

/// Target size of a chunk, in characters.
const CHUNK_CHARS: usize = 800;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "is", "it",
    "of", "on", "or", "that", "the", "this", "to", "was", "what", "when", "where", "which",
    "who", "why", "with",
];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid workspace id '{0}': use letters, digits, '-' or '_'")]
    InvalidWorkspaceId(String),

    #[error("Workspace '{0}' not found")]
    WorkspaceNotFound(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt document: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One ranked chunk returned by [`RetrievalStore::search`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_id: String,
    pub source: String,
    pub title: String,
    pub chunk_index: usize,
    pub content: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct RetrievalStore {
    root: PathBuf,
}

impl RetrievalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn workspace_path(&self, workspace_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !workspace_id.is_empty()
            && workspace_id.len() <= 64
            && workspace_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidWorkspaceId(workspace_id.into()));
        }
        Ok(self.root.join(workspace_id))
    }

    /// Create a workspace, generating an id when none is given. Idempotent.
    pub async fn create_workspace(&self, workspace_id: Option<&str>) -> Result<String, StoreError> {
        let id = match workspace_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => format!("ws-{}", &uuid::Uuid::new_v4().simple().to_string()[..12]),
        };
        let path = self.workspace_path(&id)?;
        tokio::fs::create_dir_all(path.join("docs")).await?;
        info!(workspace = %id, "Retrieval workspace ready");
        Ok(id)
    }

    pub async fn workspace_exists(&self, workspace_id: &str) -> Result<bool, StoreError> {
        let path = self.workspace_path(workspace_id)?;
        Ok(tokio::fs::try_exists(path.join("docs")).await.unwrap_or(false))
    }

    /// Store a document, creating the workspace if needed.
    pub async fn add_document(
        &self,
        workspace_id: &str,
        source: &str,
        title: &str,
        content: &str,
    ) -> Result<Document, StoreError> {
        self.create_workspace(Some(workspace_id)).await?;
        let doc = Document {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
        };
        let path = self
            .workspace_path(workspace_id)?
            .join("docs")
            .join(format!("{}.json", doc.id));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&doc)?).await?;
        debug!(workspace = workspace_id, document = %doc.id, bytes = content.len(), "Document stored");
        Ok(doc)
    }

    /// All documents in a workspace, oldest first.
    pub async fn list_documents(&self, workspace_id: &str) -> Result<Vec<Document>, StoreError> {
        if !self.workspace_exists(workspace_id).await? {
            return Err(StoreError::WorkspaceNotFound(workspace_id.into()));
        }
        let dir = self.workspace_path(workspace_id)?.join("docs");
        let mut reader = tokio::fs::read_dir(&dir).await?;
        let mut docs = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(entry.path()).await?;
            docs.push(serde_json::from_slice::<Document>(&bytes)?);
        }
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(docs)
    }

    /// Keyword search over chunked documents; best hits first.
    pub async fn search(
        &self,
        workspace_id: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let terms = tokenize(query);
        let docs = self.list_documents(workspace_id).await?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = docs
            .iter()
            .flat_map(|doc| {
                chunk_text(&doc.content)
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, chunk)| {
                        let score = score_chunk(&terms, &chunk, &doc.title);
                        (score > 0.0).then(|| SearchHit {
                            document_id: doc.id.clone(),
                            source: doc.source.clone(),
                            title: doc.title.clone(),
                            chunk_index: i,
                            content: chunk,
                            score,
                        })
                    })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Lowercased content words, minus stopwords and single characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > 1 && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Split on blank lines, packing paragraphs up to the chunk size.
fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() && current.len() + para.len() > CHUNK_CHARS {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(para);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Fraction of query terms present, plus a small frequency and title bonus.
fn score_chunk(terms: &[String], chunk: &str, title: &str) -> f64 {
    let words: Vec<String> = chunk
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .collect();
    let title = title.to_lowercase();

    let mut matched = 0usize;
    let mut frequency = 0usize;
    let mut title_hits = 0usize;
    for term in terms {
        let count = words.iter().filter(|w| *w == term).count();
        if count > 0 {
            matched += 1;
            frequency += count;
        }
        if title.contains(term.as_str()) {
            title_hits += 1;
        }
    }
    if matched == 0 {
        return 0.0;
    }

    let coverage = matched as f64 / terms.len() as f64;
    let density = (frequency as f64).ln_1p() / 10.0;
    let title_bonus = 0.1 * title_hits as f64 / terms.len() as f64;
    ((coverage + density + title_bonus) * 1000.0).round() / 1000.0
}

/// Render hits as a prompt-ready context block.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] {} ({})\n{}",
                i + 1,
                hit.title,
                hit.source,
                hit.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
