//! Retrieval workspace creation tool.

use async_trait::async_trait;
use std::sync::Arc;
use steward_core::error::ToolError;
use steward_core::tool::{Tool, ToolResult};

use crate::retrieval_store::RetrievalStore;

pub struct CreateWorkspaceTool {
    store: Arc<RetrievalStore>,
}

impl CreateWorkspaceTool {
    pub fn new(store: Arc<RetrievalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateWorkspaceTool {
    fn name(&self) -> &str {
        "create_workspace"
    }

    fn description(&self) -> &str {
        "Create a new retrieval workspace for storing scraped documents. Generates an id when none is given."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "workspace_id": {
                    "type": "string",
                    "description": "Optional id for the workspace (letters, digits, '-' or '_')"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let requested = arguments["workspace_id"].as_str();

        let payload = match self.store.create_workspace(requested).await {
            Ok(id) => serde_json::json!({
                "status": "success",
                "workspace_id": id,
                "message": format!("Workspace created successfully with ID: {id}"),
            }),
            Err(e) => serde_json::json!({ "status": "error", "message": e.to_string() }),
        };
        Ok(ToolResult::json(payload))
    }
}
