use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agent::roster::AgentKind;
use crate::platform::types::PostedReview;
use crate::workflow::state::RunState;

/// Limits that guarantee a workflow terminates.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowBudget {
    /// Handoffs allowed before the workflow is abandoned.
    pub max_handoffs: u32,
    pub wall_clock: Duration,
}

impl Default for WorkflowBudget {
    fn default() -> Self {
        Self {
            max_handoffs: 16,
            wall_clock: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handoff {
    pub from: AgentKind,
    pub to: AgentKind,
    pub reason: String,
}

/// Outcome of a workflow that posted its review.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub review: PostedReview,
    pub state: RunState,
    pub handoffs: Vec<Handoff>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkflowReport {
    /// How many times control moved from `from` to `to`.
    pub fn handoff_count(&self, from: AgentKind, to: AgentKind) -> usize {
        self.handoffs
            .iter()
            .filter(|h| h.from == from && h.to == to)
            .count()
    }
}
