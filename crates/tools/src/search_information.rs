//! Retrieval search tool over documents stored by `scrape_url`.

use async_trait::async_trait;
use std::sync::Arc;
use steward_core::error::ToolError;
use steward_core::tool::{Tool, ToolResult};
use tracing::debug;

use crate::retrieval_store::{DEFAULT_WORKSPACE, RetrievalStore, format_context};

const DEFAULT_MAX_RESULTS: u64 = 5;

pub struct SearchInformationTool {
    store: Arc<RetrievalStore>,
}

impl SearchInformationTool {
    pub fn new(store: Arc<RetrievalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchInformationTool {
    fn name(&self) -> &str {
        "search_information"
    }

    fn description(&self) -> &str {
        "Search previously scraped documents in a workspace. Returns the most relevant passages and a ready-to-use context block."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for"
                },
                "workspace_id": {
                    "type": "string",
                    "description": "Workspace to search (default: \"default\")"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of passages to return (default 5)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let workspace_id = arguments["workspace_id"].as_str().unwrap_or(DEFAULT_WORKSPACE);
        let max_results = arguments["max_results"]
            .as_u64()
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, 20) as usize;

        debug!(query, workspace = workspace_id, max_results, "Searching workspace");

        let payload = match self.store.search(workspace_id, query, max_results).await {
            Ok(hits) if hits.is_empty() => serde_json::json!({
                "status": "success",
                "query": query,
                "workspace_id": workspace_id,
                "result_count": 0,
                "results": [],
                "formatted_context": "",
                "message": format!("No relevant information found for '{query}'"),
            }),
            Ok(hits) => serde_json::json!({
                "status": "success",
                "query": query,
                "workspace_id": workspace_id,
                "result_count": hits.len(),
                "formatted_context": format_context(&hits),
                "results": hits,
            }),
            Err(e) => serde_json::json!({ "status": "error", "message": e.to_string() }),
        };
        Ok(ToolResult::json(payload))
    }
}
