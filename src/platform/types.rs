use serde::{Deserialize, Serialize};

/// Placeholder used when a pull request has no description.
pub const EMPTY_BODY: &str = "<Empty body>";

/// Point-in-time view of a pull request as handed to the agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSnapshot {
    pub author: String,
    pub title: String,
    /// Never empty: a missing description is replaced with [`EMPTY_BODY`].
    pub body: String,
    pub diff_url: String,
    pub state: String,
    pub head_sha: String,
    #[serde(rename = "commit_SHAs")]
    pub commit_shas: Vec<String>,
}

impl PullRequestSnapshot {
    pub fn normalize_body(body: Option<String>) -> String {
        match body {
            Some(b) if !b.trim().is_empty() => b,
            _ => EMPTY_BODY.to_string(),
        }
    }
}

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    /// `added`, `modified`, `removed`, `renamed`, ...
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedReview {
    pub review_id: u64,
    pub state: String,
    pub html_url: Option<String>,
}
