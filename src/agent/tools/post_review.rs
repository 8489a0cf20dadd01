use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::json;

use crate::agent::claude::ToolDefinition;
use crate::agent::tools::{Tool, ToolContext, ToolOutput};
use crate::error::{AppError, Result};

/// The single post a workflow may make.
///
/// A post in flight holds the claim; a post the gateway rejects gives it back.
#[derive(Debug, Default)]
pub struct PostGuard {
    claimed: AtomicBool,
}

impl PostGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a post is in flight or once one has been made.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Take the claim. Returns false if someone already holds it.
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Give back a claim whose post did not go through.
    pub fn release(&self) {
        self.claimed.store(false, Ordering::SeqCst);
    }
}

pub struct PostFinalReviewTool;

impl PostFinalReviewTool {
    fn second_post(ctx: &ToolContext<'_>) -> AppError {
        AppError::ProtocolViolation(format!(
            "{} tried to post a second review on PR #{}",
            ctx.caller, ctx.pr_number
        ))
    }
}

#[async_trait]
impl Tool for PostFinalReviewTool {
    fn name(&self) -> &str {
        "post_final_review_to_github"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "post_final_review_to_github".to_string(),
            description: "Post the CommentorAgent's saved draft as a review comment on the pull request and save it as the final review. The draft must pass the rubric. This ends the review.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "final_review_comment": {
                        "type": "string",
                        "description": "Optional: the draft text you approved. Must match the saved draft."
                    }
                }
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        if ctx.post_guard.is_claimed() {
            return Err(Self::second_post(ctx));
        }

        let draft = match ctx.approved_draft(input["final_review_comment"].as_str()).await {
            Ok(draft) => draft,
            Err(problem) => {
                return Ok(ToolOutput::Error(format!("Nothing was posted. {problem}")));
            }
        };

        if !ctx.post_guard.try_claim() {
            return Err(Self::second_post(ctx));
        }

        match ctx.gateway.post_review(ctx.pr_number, &draft).await {
            Ok(review) => {
                ctx.state.edit(|s| s.final_review_comment = draft).await;
                Ok(ToolOutput::Posted(review))
            }
            Err(e) => {
                ctx.post_guard.release();
                Ok(ToolOutput::Error(format!("Failed to post review: {e}")))
            }
        }
    }
}
