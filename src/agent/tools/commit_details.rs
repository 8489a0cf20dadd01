use async_trait::async_trait;
use serde_json::json;

use crate::agent::claude::ToolDefinition;
use crate::agent::tools::{require_param, Tool, ToolContext, ToolOutput};
use crate::error::Result;

pub struct GetCommitDetailsTool;

#[async_trait]
impl Tool for GetCommitDetailsTool {
    fn name(&self) -> &str {
        "get_commit_details"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_commit_details".to_string(),
            description: "Get the files changed by a commit, with their status, additions, deletions and patches. Pass the PR head SHA to see the changed files of the PR.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "head_sha": {
                        "type": "string",
                        "description": "The commit SHA"
                    }
                },
                "required": ["head_sha"]
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        let head_sha = require_param!(input, "head_sha");

        match ctx.gateway.fetch_commit_details(head_sha).await {
            Ok(files) => Ok(ToolOutput::Success(serde_json::to_string_pretty(&files)?)),
            Err(e) => Ok(ToolOutput::Error(format!(
                "Failed to fetch commit {head_sha}: {e}"
            ))),
        }
    }
}
