//! Directory listing tool.

use async_trait::async_trait;
use std::path::PathBuf;
use steward_core::error::ToolError;
use steward_core::tool::{Tool, ToolResult};

use crate::path_guard::resolve_in_workspace;

pub struct ListFilesTool {
    pub workspace: PathBuf,
    pub forbidden_paths: Vec<String>,
}

impl ListFilesTool {
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
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "Lists the files and directories inside a workspace directory. Directories end with '/'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Relative directory to list (default: the workspace root)."
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let directory = arguments["directory"].as_str().unwrap_or(".");

        let target = if directory.is_empty() || directory == "." {
            self.workspace.clone()
        } else {
            resolve_in_workspace(&self.workspace, directory, &self.forbidden_paths).map_err(
                |e| ToolError::PermissionDenied {
                    tool_name: "list_files".into(),
                    reason: e.to_string(),
                },
            )?
        };

        let mut reader = match tokio::fs::read_dir(&target).await {
            Ok(r) => r,
            Err(e) => {
                return Ok(ToolResult {
                    success: false,
                    output: format!("Error listing directory: {e}"),
                    data: None,
                });
            }
        };

        let mut entries = Vec::new();
        while let Ok(Some(entry)) = reader.next_entry().await {
            let mut name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        if entries.is_empty() {
            return Ok(ToolResult::ok("(empty directory)"));
        }
        Ok(ToolResult {
            success: true,
            output: entries.join("\n"),
            data: Some(serde_json::json!(entries)),
        })
    }
}
