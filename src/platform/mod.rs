pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::GatewayError;
use types::*;

/// Read and write access to the pull request under review.
///
/// Implementations are shared by all agents of a workflow, so they must be
/// safe to call from any task.
#[async_trait]
pub trait RepositoryGateway: Send + Sync {
    /// Fetch pull request metadata and its commit SHAs.
    async fn fetch_pull_request(
        &self,
        pr_number: u64,
    ) -> std::result::Result<PullRequestSnapshot, GatewayError>;

    /// Fetch a file's text at `git_ref`, or at the default branch when `None`.
    async fn fetch_file_contents(
        &self,
        file_path: &str,
        git_ref: Option<&str>,
    ) -> std::result::Result<String, GatewayError>;

    /// Fetch the files changed by a commit.
    async fn fetch_commit_details(
        &self,
        head_sha: &str,
    ) -> std::result::Result<Vec<ChangedFile>, GatewayError>;

    /// Post a review comment on the pull request.
    async fn post_review(
        &self,
        pr_number: u64,
        body: &str,
    ) -> std::result::Result<PostedReview, GatewayError>;
}
