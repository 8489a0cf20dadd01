use async_trait::async_trait;
use serde_json::json;

use crate::agent::claude::ToolDefinition;
use crate::agent::tools::{Tool, ToolContext, ToolOutput};
use crate::error::Result;

pub struct CheckReviewRubricTool;

#[async_trait]
impl Tool for CheckReviewRubricTool {
    fn name(&self) -> &str {
        "check_review_rubric"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "check_review_rubric".to_string(),
            description: "Check a review against the rubric: 100-200 words, says what is good, quotes lines with improvement suggestions. Checks the saved draft when no text is given.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "review_comment": {
                        "type": "string",
                        "description": "Optional: the review text to check"
                    }
                }
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        let review = match input["review_comment"].as_str() {
            Some(text) => text.to_string(),
            None => ctx.state.snapshot().await.review_comment,
        };

        if review.trim().is_empty() {
            return Ok(ToolOutput::Error(
                "There is no draft review yet. Hand off to the CommentorAgent to write one."
                    .to_string(),
            ));
        }

        Ok(ToolOutput::Success(ctx.rubric.evaluate(&review).explanation()))
    }
}
