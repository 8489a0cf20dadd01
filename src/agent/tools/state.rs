//! Tools that write the shared run state.

use async_trait::async_trait;
use serde_json::json;

use crate::agent::claude::ToolDefinition;
use crate::agent::tools::{require_param, Tool, ToolContext, ToolOutput};
use crate::error::Result;

fn single_text_schema(key: &str, description: &str) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        key.to_string(),
        json!({ "type": "string", "description": description }),
    );
    json!({
        "type": "object",
        "properties": properties,
        "required": [key]
    })
}

pub struct AddContextToStateTool;

#[async_trait]
impl Tool for AddContextToStateTool {
    fn name(&self) -> &str {
        "add_context_to_state"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "add_context_to_state".to_string(),
            description: "Save everything you gathered so the CommentorAgent can use it. Replaces any context saved earlier.".to_string(),
            input_schema: single_text_schema(
                "gathered_contexts",
                "All gathered PR details, changed files, patches and requested file contents",
            ),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        let gathered = require_param!(input, "gathered_contexts").to_string();
        ctx.state.edit(|s| s.gathered_contexts = gathered).await;
        Ok(ToolOutput::Success("Context gathered.".to_string()))
    }
}

pub struct SaveDraftCommentTool;

#[async_trait]
impl Tool for SaveDraftCommentTool {
    fn name(&self) -> &str {
        "save_draft_comment_to_state"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "save_draft_comment_to_state".to_string(),
            description: "Save your draft review comment so the ReviewAndPostingAgent can check it. Replaces any earlier draft.".to_string(),
            input_schema: single_text_schema("draft_comment", "The full markdown review draft"),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        let draft = require_param!(input, "draft_comment");
        if draft.trim().is_empty() {
            return Ok(ToolOutput::Error("The draft is empty".to_string()));
        }
        let draft = draft.to_string();
        ctx.state.edit(|s| s.review_comment = draft).await;
        Ok(ToolOutput::Success("Comment drafted.".to_string()))
    }
}

pub struct AddFinalReviewTool;

#[async_trait]
impl Tool for AddFinalReviewTool {
    fn name(&self) -> &str {
        "add_final_review_to_state"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "add_final_review_to_state".to_string(),
            description: "Approve the CommentorAgent's saved draft as the final review. The draft must pass the rubric.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "final_review": {
                        "type": "string",
                        "description": "Optional: the draft text you approved. Must match the saved draft."
                    }
                }
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        let final_review = match ctx.approved_draft(input["final_review"].as_str()).await {
            Ok(draft) => draft,
            Err(problem) => return Ok(ToolOutput::Error(problem)),
        };

        ctx.state.edit(|s| s.final_review_comment = final_review).await;
        Ok(ToolOutput::Success(
            "Final review ready and needs to be posted to GitHub.".to_string(),
        ))
    }
}
