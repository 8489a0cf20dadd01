use async_trait::async_trait;
use serde_json::json;

use crate::agent::claude::ToolDefinition;
use crate::agent::tools::{Tool, ToolContext, ToolOutput};
use crate::error::Result;

pub struct GetPrDetailsTool;

#[async_trait]
impl Tool for GetPrDetailsTool {
    fn name(&self) -> &str {
        "get_pr_details"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_pr_details".to_string(),
            description: "Fetch pull request details: author, title, body, diff_url, state, head SHA and the SHAs of all its commits.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pr_number": {
                        "type": "integer",
                        "description": "The pull request number"
                    }
                },
                "required": ["pr_number"]
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        // Models occasionally send the number as a string
        let pr_number = match &input["pr_number"] {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
            _ => None,
        };
        let Some(pr_number) = pr_number else {
            return Ok(ToolOutput::Error(
                "Missing or invalid 'pr_number' parameter".to_string(),
            ));
        };

        match ctx.gateway.fetch_pull_request(pr_number).await {
            Ok(snapshot) => Ok(ToolOutput::Success(serde_json::to_string_pretty(&snapshot)?)),
            Err(e) => Ok(ToolOutput::Error(format!(
                "Failed to fetch PR #{pr_number}: {e}"
            ))),
        }
    }
}
