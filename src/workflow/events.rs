use serde::Serialize;
use tokio::sync::mpsc;

use crate::agent::roster::AgentKind;

/// Progress notifications emitted while a workflow runs, in the order they
/// happen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Control moved to `agent`. Always precedes that agent's first action.
    AgentSwitch { agent: AgentKind },
    ToolCallRequested {
        agent: AgentKind,
        tool: String,
        input: serde_json::Value,
    },
    ToolCallResult {
        agent: AgentKind,
        tool: String,
        output: String,
        is_error: bool,
    },
    /// A model response: its text, if any, and the tools it selected.
    AgentOutput {
        agent: AgentKind,
        text: String,
        tool_calls: Vec<String>,
    },
}

/// Sending half of the observation stream. Dropped receivers are ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: WorkflowEvent) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Log one event the way the CLI presents progress.
pub fn log_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::AgentSwitch { agent } => {
            tracing::info!(agent = %agent, "Current agent: {agent}");
        }
        WorkflowEvent::ToolCallRequested { agent, tool, input } => {
            tracing::info!(agent = %agent, tool = %tool, input = %input, "Calling selected tool");
        }
        WorkflowEvent::ToolCallResult {
            agent,
            tool,
            output,
            is_error,
        } => {
            if *is_error {
                tracing::warn!(agent = %agent, tool = %tool, "Tool error: {output}");
            } else {
                tracing::info!(agent = %agent, tool = %tool, "Output from tool: {output}");
            }
        }
        WorkflowEvent::AgentOutput {
            agent,
            text,
            tool_calls,
        } => {
            if !text.is_empty() {
                tracing::info!(agent = %agent, "Agent response: {text}");
            }
            if !tool_calls.is_empty() {
                tracing::info!(agent = %agent, tools = ?tool_calls, "Selected tools");
            }
        }
    }
}
