use tokio_util::sync::CancellationToken;

use crate::agent::claude::{ContentBlock, LanguageModel, Message, MessagesRequest};
use crate::agent::prompt;
use crate::agent::roster::{AgentKind, AgentProfile};
use crate::agent::tools::{ToolContext, ToolOutput};
use crate::error::{AppError, Result};
use crate::platform::types::PostedReview;
use crate::workflow::events::{EventSink, WorkflowEvent};

const POST_TOOL: &str = "post_final_review_to_github";

/// How one agent activation ended.
#[derive(Debug)]
pub enum AgentOutcome {
    /// The agent passed control to another agent.
    HandedOff { to: AgentKind, reason: String },
    /// The review was posted. Terminal for the workflow.
    Posted(PostedReview),
}

pub struct AgentEngine<'m> {
    model: &'m dyn LanguageModel,
    max_turns: u32,
}

impl<'m> AgentEngine<'m> {
    pub fn new(model: &'m dyn LanguageModel, max_turns: u32) -> Self {
        Self { model, max_turns }
    }

    /// Run the agentic loop for one activation of `agent`.
    ///
    /// - `input`: the message that opens the activation.
    /// - `ctx`: shared resources for tool handlers; `ctx.caller` is `agent.kind`.
    /// - `events`: observation stream.
    /// - `cancel`: checked before each turn and raced against every await.
    pub async fn run(
        &self,
        agent: &AgentProfile,
        input: &str,
        ctx: &ToolContext<'_>,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<AgentOutcome> {
        let tool_definitions = agent.tools.definitions();
        let mut messages = vec![Message::user(input)];

        let mut total_input_tokens = 0u32;
        let mut total_output_tokens = 0u32;

        for turn in 0..self.max_turns {
            if cancel.is_cancelled() {
                tracing::info!(agent = %agent.kind, "Agent cancelled");
                return Err(AppError::Cancelled);
            }

            tracing::debug!(agent = %agent.kind, turn = turn, "Agent turn");

            // The state may have changed since the last turn
            let state = ctx.state.snapshot().await;
            let request = MessagesRequest {
                model: self.model.model().to_string(),
                max_tokens: self.model.max_tokens(),
                system: prompt::with_run_state(&agent.system_prompt, &state),
                messages: messages.clone(),
                tools: tool_definitions.clone(),
            };

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                r = self.model.send_message(agent.kind, &request) => r?,
            };

            total_input_tokens += response.usage.input_tokens;
            total_output_tokens += response.usage.output_tokens;

            tracing::info!(
                agent = %agent.kind,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                stop_reason = ?response.stop_reason,
                "Claude response"
            );

            events.emit(WorkflowEvent::AgentOutput {
                agent: agent.kind,
                text: extract_text(&response.content),
                tool_calls: tool_names(&response.content),
            });

            let stop_reason = response.stop_reason.as_deref().unwrap_or("unknown");

            match stop_reason {
                "tool_use" => {
                    messages.push(Message::assistant_blocks(response.content.clone()));

                    let mut tool_results = Vec::new();
                    let calls: Vec<(&String, &String, &serde_json::Value)> = response
                        .content
                        .iter()
                        .filter_map(|block| match block {
                            ContentBlock::ToolUse { id, name, input } => Some((id, name, input)),
                            _ => None,
                        })
                        .collect();

                    for (index, (id, name, input)) in calls.iter().enumerate() {
                        events.emit(WorkflowEvent::ToolCallRequested {
                            agent: agent.kind,
                            tool: name.to_string(),
                            input: (*input).clone(),
                        });

                        let result = tokio::select! {
                            _ = cancel.cancelled() => return Err(AppError::Cancelled),
                            r = self.execute_tool(agent, ctx, name, input) => r,
                        };

                        let (content, is_error) = match result {
                            Ok(ToolOutput::Success(content)) => (content, false),
                            Ok(ToolOutput::Error(error)) => {
                                tracing::warn!(agent = %agent.kind, tool = %name, error = %error, "Tool error");
                                (error, true)
                            }
                            Ok(ToolOutput::Handoff { to, reason }) => {
                                events.emit(WorkflowEvent::ToolCallResult {
                                    agent: agent.kind,
                                    tool: name.to_string(),
                                    output: format!("Handing off to {to}"),
                                    is_error: false,
                                });
                                if index + 1 < calls.len() {
                                    tracing::warn!(
                                        agent = %agent.kind,
                                        skipped = calls.len() - index - 1,
                                        "Ignoring tool calls after handoff"
                                    );
                                }
                                tracing::info!(
                                    agent = %agent.kind,
                                    to = %to,
                                    total_input_tokens,
                                    total_output_tokens,
                                    turns = turn + 1,
                                    "Agent handed off"
                                );
                                return Ok(AgentOutcome::HandedOff { to, reason });
                            }
                            Ok(ToolOutput::Posted(review)) => {
                                events.emit(WorkflowEvent::ToolCallResult {
                                    agent: agent.kind,
                                    tool: name.to_string(),
                                    output: serde_json::to_string(&review)?,
                                    is_error: false,
                                });
                                if calls[index + 1..].iter().any(|(_, n, _)| n.as_str() == POST_TOOL) {
                                    return Err(AppError::ProtocolViolation(format!(
                                        "{} tried to post more than one review",
                                        agent.kind
                                    )));
                                }
                                return Ok(AgentOutcome::Posted(review));
                            }
                            Err(e) if e.is_fatal() => {
                                tracing::error!(agent = %agent.kind, tool = %name, error = %e, "Fatal tool error");
                                return Err(e);
                            }
                            Err(e) => {
                                tracing::error!(agent = %agent.kind, tool = %name, error = %e, "Tool execution error");
                                (format!("Internal error: {e}"), true)
                            }
                        };

                        events.emit(WorkflowEvent::ToolCallResult {
                            agent: agent.kind,
                            tool: name.to_string(),
                            output: content.clone(),
                            is_error,
                        });
                        tool_results.push(ContentBlock::ToolResult {
                            tool_use_id: id.to_string(),
                            content,
                            is_error: is_error.then_some(true),
                        });
                    }

                    messages.push(Message::user_blocks(tool_results));
                }
                "end_turn" => {
                    // Agents act only through tools; push it back on track
                    tracing::warn!(agent = %agent.kind, "Agent answered directly");
                    messages.push(Message::assistant_blocks(response.content));
                    messages.push(Message::user(direct_answer_nudge(agent.kind)));
                }
                "max_tokens" => {
                    tracing::warn!(agent = %agent.kind, "Agent response hit max_tokens limit");
                    messages.push(Message::assistant_blocks(response.content));
                    messages.push(Message::user("Please continue."));
                }
                other => {
                    tracing::warn!(agent = %agent.kind, stop_reason = other, "Unexpected stop reason");
                    return Err(AppError::Agent(format!(
                        "{} stopped with unexpected reason: {other}",
                        agent.kind
                    )));
                }
            }
        }

        tracing::warn!(agent = %agent.kind, max_turns = self.max_turns, "Agent hit turn limit");
        Err(AppError::WorkflowBudgetExceeded(format!(
            "{} used all {} turns without handing off",
            agent.kind, self.max_turns
        )))
    }

    async fn execute_tool(
        &self,
        agent: &AgentProfile,
        ctx: &ToolContext<'_>,
        name: &str,
        input: &serde_json::Value,
    ) -> Result<ToolOutput> {
        let tool = agent
            .tools
            .get(name)
            .ok_or_else(|| AppError::Agent(format!("Unknown tool: {name}")))?;

        tool.execute(ctx, input.clone()).await
    }
}

fn direct_answer_nudge(kind: AgentKind) -> String {
    let targets = kind
        .handoff_targets()
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(" or ");
    format!(
        "Do not answer directly. Continue with your tools, and use the handoff tool to pass control to {targets} when you are done."
    )
}

fn extract_text(content: &[ContentBlock]) -> String {
    content
        .iter()
        .filter_map(|block| {
            if let ContentBlock::Text { text } = block {
                Some(text.as_str())
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tool_names(content: &[ContentBlock]) -> Vec<String> {
    content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}
