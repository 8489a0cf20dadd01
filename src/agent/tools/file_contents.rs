use async_trait::async_trait;
use serde_json::json;

use crate::agent::claude::ToolDefinition;
use crate::agent::tools::{Tool, ToolContext, ToolOutput};
use crate::error::Result;

pub struct GetFileContentsTool;

#[async_trait]
impl Tool for GetFileContentsTool {
    fn name(&self) -> &str {
        "get_file_contents"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_file_contents".to_string(),
            description: "Retrieve the contents of a file in the repository. Use this for files the reviewer needs beyond the patch.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file from the repository root"
                    },
                    "ref": {
                        "type": "string",
                        "description": "Optional: git reference (branch name or commit SHA)"
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        let Some(file_path) = input["file_path"].as_str().or_else(|| input["path"].as_str()) else {
            return Ok(ToolOutput::Error("Missing 'file_path' parameter".to_string()));
        };
        let git_ref = input["ref"].as_str().filter(|r| !r.is_empty());

        match ctx.gateway.fetch_file_contents(file_path, git_ref).await {
            Ok(content) => Ok(ToolOutput::Success(content)),
            Err(e) => Ok(ToolOutput::Error(format!("Failed to read {file_path}: {e}"))),
        }
    }
}
