use async_trait::async_trait;
use serde_json::json;

use crate::agent::claude::ToolDefinition;
use crate::agent::roster::AgentKind;
use crate::agent::tools::{Tool, ToolContext, ToolOutput};
use crate::error::{AppError, Result};

/// Transfers control to another agent from the caller's allow-list.
pub struct HandoffTool {
    from: AgentKind,
}

impl HandoffTool {
    pub fn new(from: AgentKind) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Tool for HandoffTool {
    fn name(&self) -> &str {
        "handoff"
    }

    fn definition(&self) -> ToolDefinition {
        let targets = self.from.handoff_targets();
        let listing = targets
            .iter()
            .map(|t| format!("{t}: {}", t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        ToolDefinition {
            name: "handoff".to_string(),
            description: format!(
                "Hand control to another agent. Explain what you need from it in the reason.\n\nAvailable agents:\n{listing}"
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to_agent": {
                        "type": "string",
                        "enum": targets.iter().map(|t| t.name()).collect::<Vec<_>>(),
                        "description": "The agent to hand off to"
                    },
                    "reason": {
                        "type": "string",
                        "description": "Why you are handing off and what the next agent should do"
                    }
                },
                "required": ["to_agent", "reason"]
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext<'_>, input: serde_json::Value) -> Result<ToolOutput> {
        let requested = input["to_agent"].as_str().unwrap_or_default();

        let to: AgentKind = requested.parse().map_err(|e| {
            AppError::ProtocolViolation(format!("{} requested handoff to {e}", self.from))
        })?;

        if !self.from.can_hand_off_to(to) {
            return Err(AppError::ProtocolViolation(format!(
                "{} may not hand off to {to}",
                self.from
            )));
        }

        debug_assert_eq!(ctx.caller, self.from);

        let reason = input["reason"].as_str().unwrap_or_default().to_string();
        Ok(ToolOutput::Handoff { to, reason })
    }
}
