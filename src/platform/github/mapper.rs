use base64::Engine;
use serde::Deserialize;

use crate::error::GatewayError;
use crate::platform::types;

// Only the fields we read from the REST responses.

#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiPullRequest {
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub diff_url: Option<String>,
    pub state: String,
    pub head: ApiRef,
}

#[derive(Debug, Deserialize)]
pub struct ApiCommitRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCommit {
    #[serde(default)]
    pub files: Vec<ApiCommitFile>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCommitFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    #[serde(default)]
    pub patch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiReview {
    pub id: u64,
    pub state: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Map a pull request and its commits to the snapshot agents see.
pub fn map_pull_request(pr: ApiPullRequest, commits: Vec<ApiCommitRef>) -> types::PullRequestSnapshot {
    types::PullRequestSnapshot {
        author: pr.user.map(|u| u.login).unwrap_or_else(|| "unknown".to_string()),
        title: pr.title.unwrap_or_default(),
        body: types::PullRequestSnapshot::normalize_body(pr.body),
        diff_url: pr.diff_url.unwrap_or_default(),
        state: pr.state,
        head_sha: pr.head.sha,
        commit_shas: commits.into_iter().map(|c| c.sha).collect(),
    }
}

pub fn map_commit_files(commit: ApiCommit) -> Vec<types::ChangedFile> {
    commit
        .files
        .into_iter()
        .map(|f| types::ChangedFile {
            filename: f.filename,
            status: f.status,
            additions: f.additions,
            deletions: f.deletions,
            changes: f.changes,
            patch: f.patch,
        })
        .collect()
}

pub fn map_review(review: ApiReview) -> types::PostedReview {
    types::PostedReview {
        review_id: review.id,
        state: review.state,
        html_url: review.html_url,
    }
}

/// Decode a response from the repository contents endpoint into UTF-8 text.
pub fn decode_contents(file_path: &str, response: &serde_json::Value) -> Result<String, GatewayError> {
    if response.is_array() {
        return Err(GatewayError::Decode(format!("{file_path}: path is a directory")));
    }

    let encoding = response["encoding"].as_str().unwrap_or("base64");
    let content = response["content"]
        .as_str()
        .ok_or_else(|| GatewayError::Decode(format!("{file_path}: response has no content")))?;

    if encoding != "base64" {
        return Err(GatewayError::Decode(format!(
            "{file_path}: unsupported encoding {encoding}"
        )));
    }

    // GitHub wraps base64 content at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| GatewayError::Decode(format!("{file_path}: invalid base64: {e}")))?;

    String::from_utf8(bytes).map_err(|_| GatewayError::Decode(format!("{file_path}: not valid UTF-8")))
}
