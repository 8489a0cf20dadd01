pub mod commit_details;
pub mod file_contents;
pub mod handoff;
pub mod post_review;
pub mod pr_details;
pub mod rubric_check;
pub mod state;

use async_trait::async_trait;

use crate::agent::claude::ToolDefinition;
use crate::agent::roster::AgentKind;
use crate::error::Result;
use crate::platform::types::PostedReview;
use crate::platform::RepositoryGateway;
use crate::workflow::rubric::Rubric;
use crate::workflow::state::RunStateStore;

use post_review::PostGuard;

/// Extract a required string parameter or return a tool error to the model.
macro_rules! require_param {
    ($input:expr, $key:expr) => {
        match $input[$key].as_str() {
            Some(value) => value,
            None => {
                return Ok($crate::agent::tools::ToolOutput::Error(format!(
                    "Missing '{}' parameter",
                    $key
                )))
            }
        }
    };
}
pub(crate) use require_param;

/// Shared resources a tool handler may touch during one workflow.
pub struct ToolContext<'a> {
    /// Agent currently holding control.
    pub caller: AgentKind,
    pub pr_number: u64,
    pub gateway: &'a dyn RepositoryGateway,
    pub state: &'a RunStateStore,
    pub rubric: &'a dyn Rubric,
    pub post_guard: &'a PostGuard,
}

impl ToolContext<'_> {
    /// The saved draft, once it passes the rubric.
    ///
    /// `supplied` is the text the calling agent passed along, if any; it must
    /// match the draft. The error is a message for the model.
    pub async fn approved_draft(&self, supplied: Option<&str>) -> std::result::Result<String, String> {
        let draft = self.state.snapshot().await.review_comment;
        if draft.trim().is_empty() {
            return Err(
                "There is no draft yet. Hand off to the CommentorAgent for a draft first.".to_string(),
            );
        }

        if let Some(text) = supplied {
            if text.trim() != draft.trim() {
                return Err(
                    "The text does not match the saved draft. Only the CommentorAgent's draft can be used; hand off to it to change the wording."
                        .to_string(),
                );
            }
        }

        let verdict = self.rubric.evaluate(&draft);
        if !verdict.passed() {
            tracing::info!(word_count = verdict.word_count, "Rubric rejected draft");
            return Err(format!(
                "{}\nHand the draft back to the CommentorAgent.",
                verdict.explanation()
            ));
        }

        Ok(draft)
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput>;
}

#[derive(Debug)]
pub enum ToolOutput {
    /// Normal text result returned to Claude.
    Success(String),
    /// Error result returned to Claude (the agent can recover).
    Error(String),
    /// Control passes to another agent; ends the current activation.
    Handoff { to: AgentKind, reason: String },
    /// The review was posted; ends the workflow.
    Posted(PostedReview),
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// The capabilities of one agent, always including its handoff tool.
    pub fn for_agent(kind: AgentKind) -> Self {
        let mut tools: Vec<Box<dyn Tool>> = match kind {
            AgentKind::ContextAgent => vec![
                Box::new(pr_details::GetPrDetailsTool),
                Box::new(file_contents::GetFileContentsTool),
                Box::new(commit_details::GetCommitDetailsTool),
                Box::new(state::AddContextToStateTool),
            ],
            AgentKind::CommentorAgent => vec![Box::new(state::SaveDraftCommentTool)],
            AgentKind::ReviewAndPostingAgent => vec![
                Box::new(rubric_check::CheckReviewRubricTool),
                Box::new(state::AddFinalReviewTool),
                Box::new(post_review::PostFinalReviewTool),
            ],
        };
        tools.push(Box::new(handoff::HandoffTool::new(kind)));

        Self { tools }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }
}
