//! File read tool: read file contents from the workspace.

use async_trait::async_trait;
use std::path::PathBuf;
use steward_core::error::ToolError;
use steward_core::tool::{Tool, ToolResult};

use crate::path_guard::resolve_in_workspace;

/// Observations longer than this are cut, so one large file cannot flood the prompt.
const MAX_READ_CHARS: usize = 32_000;

pub struct ReadFileTool {
    pub workspace: PathBuf,
    pub forbidden_paths: Vec<String>,
}

impl ReadFileTool {
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
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads the text content of a file in the workspace directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The relative path of the file to read."
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let target = resolve_in_workspace(&self.workspace, path, &self.forbidden_paths).map_err(
            |e| ToolError::PermissionDenied {
                tool_name: "read_file".into(),
                reason: e.to_string(),
            },
        )?;

        match tokio::fs::read_to_string(&target).await {
            Ok(content) => {
                let output = match content.char_indices().nth(MAX_READ_CHARS) {
                    Some((cut, _)) => format!(
                        "{}\n\n[truncated: file has {} bytes]",
                        &content[..cut],
                        content.len()
                    ),
                    None => content,
                };
                Ok(ToolResult::ok(output))
            }
            Err(e) => Ok(ToolResult {
                success: false,
                output: format!("Failed to read file: {e}"),
                data: None,
            }),
        }
    }
}
