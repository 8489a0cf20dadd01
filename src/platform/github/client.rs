use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Serialize;

use crate::config::GitHubConfig;
use crate::error::{AppError, GatewayError, Result};
use crate::platform::types::*;
use crate::platform::RepositoryGateway;

use super::mapper::{self, ApiCommit, ApiCommitRef, ApiPullRequest, ApiReview};

const COMMITS_PER_PAGE: usize = 100;

pub struct GitHubGateway {
    client: Octocrab,
    owner: String,
    repo: String,
}

#[derive(Debug, Serialize)]
struct CreateReview<'a> {
    commit_id: &'a str,
    body: &'a str,
    event: &'a str,
}

impl GitHubGateway {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let (owner, repo) = config.repo_parts()?;

        let mut builder = Octocrab::builder().personal_token(config.token.clone());
        if let Some(api_base) = &config.api_base {
            builder = builder
                .base_uri(api_base.as_str())
                .map_err(|e| AppError::Config(format!("Invalid GitHub API base {api_base}: {e}")))?;
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn repo_route(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.repo)
    }

    async fn list_commit_shas(&self, pr_number: u64) -> std::result::Result<Vec<ApiCommitRef>, GatewayError> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/pulls/{pr_number}/commits?per_page={COMMITS_PER_PAGE}&page={page}",
                self.repo_route()
            );
            let batch: Vec<ApiCommitRef> = self
                .client
                .get(&url, None::<&()>)
                .await
                .map_err(|e| GatewayError::from_octocrab("list pull request commits", &e))?;

            let done = batch.len() < COMMITS_PER_PAGE;
            all.extend(batch);
            if done {
                break;
            }
            page += 1;
        }

        Ok(all)
    }
}

/// Percent-encode each segment of a repository path, keeping the separators.
fn encode_path(file_path: &str) -> String {
    file_path
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl RepositoryGateway for GitHubGateway {
    async fn fetch_pull_request(
        &self,
        pr_number: u64,
    ) -> std::result::Result<PullRequestSnapshot, GatewayError> {
        let url = format!("{}/pulls/{pr_number}", self.repo_route());
        let pr: ApiPullRequest = self
            .client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| GatewayError::from_octocrab("fetch pull request", &e))?;

        let commits = self.list_commit_shas(pr_number).await?;

        Ok(mapper::map_pull_request(pr, commits))
    }

    async fn fetch_file_contents(
        &self,
        file_path: &str,
        git_ref: Option<&str>,
    ) -> std::result::Result<String, GatewayError> {
        let mut url = format!("{}/contents/{}", self.repo_route(), encode_path(file_path));
        if let Some(git_ref) = git_ref {
            url.push_str(&format!("?ref={}", urlencoding::encode(git_ref)));
        }

        let response: serde_json::Value = self
            .client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| GatewayError::from_octocrab("fetch file contents", &e))?;

        mapper::decode_contents(file_path, &response)
    }

    async fn fetch_commit_details(
        &self,
        head_sha: &str,
    ) -> std::result::Result<Vec<ChangedFile>, GatewayError> {
        let url = format!("{}/commits/{}", self.repo_route(), urlencoding::encode(head_sha));
        let commit: ApiCommit = self
            .client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| GatewayError::from_octocrab("fetch commit", &e))?;

        Ok(mapper::map_commit_files(commit))
    }

    async fn post_review(
        &self,
        pr_number: u64,
        body: &str,
    ) -> std::result::Result<PostedReview, GatewayError> {
        // Anchor the review to the current head commit
        let url = format!("{}/pulls/{pr_number}", self.repo_route());
        let pr: ApiPullRequest = self
            .client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| GatewayError::from_octocrab("fetch pull request", &e))?;

        let request = CreateReview {
            commit_id: &pr.head.sha,
            body,
            event: "COMMENT",
        };
        let review: ApiReview = self
            .client
            .post(format!("{url}/reviews"), Some(&request))
            .await
            .map_err(|e| GatewayError::from_octocrab("create review", &e))?;

        tracing::info!(pr = pr_number, review_id = review.id, "Posted review");

        Ok(mapper::map_review(review))
    }
}
