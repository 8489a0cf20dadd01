use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::workflow::types::WorkflowBudget;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default)]
    pub token: String,
    /// Target repository as `owner/name`.
    #[serde(default)]
    pub repository: String,
    /// Override for GitHub Enterprise installs.
    #[serde(default)]
    pub api_base: Option<String>,
}

impl GitHubConfig {
    /// Split `repository` into owner and name. Exactly one `/` is allowed.
    pub fn repo_parts(&self) -> Result<(&str, &str)> {
        match self.repository.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok((owner, name))
            }
            _ => Err(AppError::Config(format!(
                "Repository must be in owner/name form, got {:?}",
                self.repository
            ))),
        }
    }
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("repository", &self.repository)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct ClaudeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Model calls allowed within a single agent activation.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub pr_number: u64,
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            pr_number: 0,
            max_handoffs: default_max_handoffs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_turns() -> u32 {
    12
}

fn default_max_handoffs() -> u32 {
    16
}

fn default_timeout_secs() -> u64 {
    600
}

/// Plain environment variables understood for compatibility with CI setups
/// that export them directly. They sit below the config file in priority.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("GITHUB_TOKEN", "github.token"),
    ("REPOSITORY", "github.repository"),
    ("GITHUB_API_URL", "github.api_base"),
    ("ANTHROPIC_API_KEY", "claude.api_key"),
];

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        for (var, key) in LEGACY_ENV {
            if let Ok(value) = std::env::var(var) {
                builder = builder
                    .set_default(*key, value)
                    .map_err(|e| AppError::Config(e.to_string()))?;
            }
        }

        if let Ok(raw) = std::env::var("PR_NUMBER") {
            let pr_number: i64 = raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("PR_NUMBER is not an integer: {raw}")))?;
            builder = builder
                .set_default("workflow.pr_number", pr_number)
                .map_err(|e| AppError::Config(e.to_string()))?;
        }

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("hyphae").required(false));
        }

        // Environment variable overrides with HYPHAE_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("HYPHAE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Check everything the workflow needs before any agent runs.
    pub fn validate(&self) -> Result<()> {
        if self.github.token.trim().is_empty() {
            return Err(AppError::Config(
                "GitHub token is required (GITHUB_TOKEN or github.token)".to_string(),
            ));
        }
        self.repo_parts()?;
        if self.claude.api_key.trim().is_empty() {
            return Err(AppError::Config(
                "Claude API key is required (ANTHROPIC_API_KEY or claude.api_key)".to_string(),
            ));
        }
        if self.workflow.pr_number == 0 {
            return Err(AppError::Config(
                "Pull request number is required (PR_NUMBER or workflow.pr_number)".to_string(),
            ));
        }
        if self.workflow.max_handoffs == 0 || self.claude.max_turns == 0 {
            return Err(AppError::Config(
                "workflow.max_handoffs and claude.max_turns must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Split `github.repository` into owner and name.
    pub fn repo_parts(&self) -> Result<(&str, &str)> {
        self.github.repo_parts()
    }

    pub fn budget(&self) -> WorkflowBudget {
        WorkflowBudget {
            max_handoffs: self.workflow.max_handoffs,
            wall_clock: Duration::from_secs(self.workflow.timeout_secs),
        }
    }
}
