//! File write tool: write or create files inside the workspace.

use async_trait::async_trait;
use std::path::PathBuf;
use steward_core::error::ToolError;
use steward_core::tool::{Tool, ToolResult};
use tracing::debug;

use crate::path_guard::resolve_in_workspace;

pub struct WriteFileTool {
    /// Root all paths resolve against.
    pub workspace: PathBuf,
    /// Forbidden path prefixes.
    pub forbidden_paths: Vec<String>,
}

impl WriteFileTool {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            forbidden_paths: Vec::new(),
        }
    }

    pub fn with_forbidden_paths(mut self, forbidden_paths: Vec<String>) -> Self {
        self.forbidden_paths = forbidden_paths;
        self
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes content to a file in the workspace directory. Creates parent directories as needed and overwrites the file if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The relative path of the file to write."
                },
                "content": {
                    "type": "string",
                    "description": "The text content to write into the file."
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let target = resolve_in_workspace(&self.workspace, path, &self.forbidden_paths).map_err(
            |e| ToolError::PermissionDenied {
                tool_name: "write_file".into(),
                reason: e.to_string(),
            },
        )?;

        if let Some(parent) = target.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult {
                success: false,
                output: format!("Failed to create directory: {e}"),
                data: None,
            });
        }

        match tokio::fs::write(&target, content).await {
            Ok(()) => {
                debug!(path = %target.display(), bytes = content.len(), "File written");
                Ok(ToolResult::ok(format!(
                    "Successfully wrote {} bytes to {path}",
                    content.len()
                )))
            }
            Err(e) => Ok(ToolResult {
                success: false,
                output: format!("Failed to write file: {e}"),
                data: None,
            }),
        }
    }
}
