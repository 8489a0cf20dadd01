use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::agent::prompt;
use crate::agent::tools::ToolRegistry;

/// The closed set of agents taking part in a review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    ContextAgent,
    CommentorAgent,
    ReviewAndPostingAgent,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [
        AgentKind::ContextAgent,
        AgentKind::CommentorAgent,
        AgentKind::ReviewAndPostingAgent,
    ];

    /// The agent that receives control when a workflow starts.
    pub const ROOT: AgentKind = AgentKind::ReviewAndPostingAgent;

    pub fn name(self) -> &'static str {
        match self {
            AgentKind::ContextAgent => "ContextAgent",
            AgentKind::CommentorAgent => "CommentorAgent",
            AgentKind::ReviewAndPostingAgent => "ReviewAndPostingAgent",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AgentKind::ContextAgent => {
                "Gathers the needed context from GitHub and saves it to state."
            }
            AgentKind::CommentorAgent => {
                "Uses the gathered context to draft a pull request review comment."
            }
            AgentKind::ReviewAndPostingAgent => {
                "Checks the draft review against the rubric and posts it to GitHub."
            }
        }
    }

    /// Agents this one may hand control to.
    ///
    /// ContextAgent and ReviewAndPostingAgent never talk to each other
    /// directly: raw repository data always passes through a draft first.
    pub fn handoff_targets(self) -> &'static [AgentKind] {
        match self {
            AgentKind::ReviewAndPostingAgent => &[AgentKind::CommentorAgent],
            AgentKind::CommentorAgent => &[AgentKind::ReviewAndPostingAgent, AgentKind::ContextAgent],
            AgentKind::ContextAgent => &[AgentKind::CommentorAgent],
        }
    }

    pub fn can_hand_off_to(self, target: AgentKind) -> bool {
        self.handoff_targets().contains(&target)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown agent {s:?}"))
    }
}

/// Everything the engine needs to run one agent: its identity, its prompt
/// and the capabilities it may call.
pub struct AgentProfile {
    pub kind: AgentKind,
    pub system_prompt: String,
    pub tools: ToolRegistry,
}

impl AgentProfile {
    pub fn build(kind: AgentKind) -> Self {
        Self {
            kind,
            system_prompt: prompt::system_prompt_for(kind),
            tools: ToolRegistry::for_agent(kind),
        }
    }
}

/// Profiles for every agent, built once per workflow.
pub struct Roster {
    profiles: Vec<AgentProfile>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            profiles: AgentKind::ALL.into_iter().map(AgentProfile::build).collect(),
        }
    }

    pub fn get(&self, kind: AgentKind) -> &AgentProfile {
        match kind {
            AgentKind::ContextAgent => &self.profiles[0],
            AgentKind::CommentorAgent => &self.profiles[1],
            AgentKind::ReviewAndPostingAgent => &self.profiles[2],
        }
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
