use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GitHub API error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Workflow budget exceeded: {0}")]
    WorkflowBudgetExceeded(String),

    #[error("Workflow cancelled")]
    Cancelled,

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("Claude API rate limited: {0}")]
    ClaudeRateLimited(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AppError {
    /// Errors that abort the whole workflow even when a tool handler raises them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::ProtocolViolation(_) | AppError::WorkflowBudgetExceeded(_) | AppError::Cancelled
        )
    }
}

/// Failures of the repository hosting API. These never abort a workflow on
/// their own; the calling agent sees them as tool errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not decode {0}")]
    Decode(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Api(String),
}

impl GatewayError {
    pub fn from_octocrab(operation: &str, e: &octocrab::Error) -> Self {
        let octocrab::Error::GitHub { source, .. } = e else {
            return GatewayError::Api(format!("{operation} failed: {e}"));
        };

        let status = source.status_code.as_u16();
        let message = format!("{operation} failed with status {status}: {}", source.message);
        let mentions_rate_limit = source.message.to_lowercase().contains("rate limit")
            || source
                .documentation_url
                .as_deref()
                .is_some_and(|url| url.contains("rate-limit"));

        match status {
            404 => GatewayError::NotFound(message),
            429 => GatewayError::RateLimited(message),
            403 if mentions_rate_limit => GatewayError::RateLimited(message),
            401 | 403 => GatewayError::Auth(message),
            _ => GatewayError::Api(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
