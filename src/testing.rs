//! Test doubles for the language model and the repository gateway.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::agent::claude::{ContentBlock, LanguageModel, MessagesRequest, MessagesResponse, Usage};
use crate::agent::roster::AgentKind;
use crate::agent::tools::post_review::PostGuard;
use crate::agent::tools::ToolContext;
use crate::error::{AppError, GatewayError, Result};
use crate::platform::types::{ChangedFile, PostedReview, PullRequestSnapshot};
use crate::platform::RepositoryGateway;
use crate::workflow::rubric::{DraftRubric, Rubric, RubricVerdict};
use crate::workflow::state::RunStateStore;

pub const PR_NUMBER: u64 = 42;

/// A review of the sample PR that passes [`DraftRubric`].
pub fn passing_draft() -> String {
    "Thanks for fixing this typo, @alice! The change is small, focused and easy to review, and the README reads much better now. In `README.md` you replaced:\n\n> -foo\n> +bar\n\nThe new wording is clearer, but \"+bar\" is still lowercase while the heading above it is capitalised. Consider capitalising it so the section stays consistent. It would also be worth searching the docs folder for other places where \"foo\" is still used, since readers following the getting started guide will hit the old name there. Could you roll the fix out everywhere in one go? Once that is done I am happy to see this merged. Nice work keeping the diff minimal and the commit message descriptive.".to_string()
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

fn response(content: Vec<ContentBlock>, stop_reason: &str) -> MessagesResponse {
    MessagesResponse {
        id: format!("msg_{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        content,
        stop_reason: Some(stop_reason.to_string()),
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

/// A model reply that calls the given tools in order.
pub fn tool_reply(calls: &[(&str, serde_json::Value)]) -> MessagesResponse {
    let content = calls
        .iter()
        .map(|(name, input)| ContentBlock::ToolUse {
            id: format!("toolu_{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            input: input.clone(),
        })
        .collect();
    response(content, "tool_use")
}

/// A model reply that answers in plain text.
pub fn text_reply(text: &str) -> MessagesResponse {
    response(
        vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        "end_turn",
    )
}

/// Language model that replays canned responses per agent.
#[derive(Default)]
pub struct ScriptedModel {
    scripts: Mutex<HashMap<AgentKind, VecDeque<MessagesResponse>>>,
    fallbacks: Mutex<HashMap<AgentKind, MessagesResponse>>,
    requests: Mutex<Vec<(AgentKind, MessagesRequest)>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, agent: AgentKind, reply: MessagesResponse) {
        self.scripts
            .lock()
            .unwrap()
            .entry(agent)
            .or_default()
            .push_back(reply);
    }

    /// Reply used once `agent`'s script runs out.
    pub fn repeat(&self, agent: AgentKind, reply: MessagesResponse) {
        self.fallbacks.lock().unwrap().insert(agent, reply);
    }

    pub fn requests(&self, agent: AgentKind) -> Vec<MessagesRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == agent)
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted"
    }

    fn max_tokens(&self) -> u32 {
        1024
    }

    async fn send_message(
        &self,
        agent: AgentKind,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse> {
        self.requests.lock().unwrap().push((agent, request.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&agent)
            .and_then(|script| script.pop_front());
        next.or_else(|| self.fallbacks.lock().unwrap().get(&agent).cloned())
            .ok_or_else(|| AppError::Agent(format!("script for {agent} is exhausted")))
    }
}

/// In-memory gateway serving one pull request (#42) with one commit.
#[derive(Default)]
pub struct MockGateway {
    posts: Mutex<Vec<(u64, String)>>,
    fail_next_post: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> Vec<(u64, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn fail_next_post(&self, error: GatewayError) {
        *self.fail_next_post.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl RepositoryGateway for MockGateway {
    async fn fetch_pull_request(
        &self,
        pr_number: u64,
    ) -> std::result::Result<PullRequestSnapshot, GatewayError> {
        if pr_number != PR_NUMBER {
            return Err(GatewayError::NotFound(format!("pull request #{pr_number}")));
        }
        Ok(PullRequestSnapshot {
            author: "alice".to_string(),
            title: "Fix typo".to_string(),
            body: PullRequestSnapshot::normalize_body(None),
            diff_url: "https://github.com/octo/widgets/pull/42.diff".to_string(),
            state: "open".to_string(),
            head_sha: "abc123".to_string(),
            commit_shas: vec!["abc123".to_string()],
        })
    }

    async fn fetch_file_contents(
        &self,
        file_path: &str,
        _git_ref: Option<&str>,
    ) -> std::result::Result<String, GatewayError> {
        match file_path {
            "README.md" => Ok("bar\n".to_string()),
            other => Err(GatewayError::NotFound(other.to_string())),
        }
    }

    async fn fetch_commit_details(
        &self,
        head_sha: &str,
    ) -> std::result::Result<Vec<ChangedFile>, GatewayError> {
        if head_sha != "abc123" {
            return Err(GatewayError::NotFound(format!("commit {head_sha}")));
        }
        Ok(vec![ChangedFile {
            filename: "README.md".to_string(),
            status: "modified".to_string(),
            additions: 1,
            deletions: 1,
            changes: 2,
            patch: Some("-foo\n+bar".to_string()),
        }])
    }

    async fn post_review(
        &self,
        pr_number: u64,
        body: &str,
    ) -> std::result::Result<PostedReview, GatewayError> {
        if let Some(error) = self.fail_next_post.lock().unwrap().take() {
            return Err(error);
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push((pr_number, body.to_string()));
        Ok(PostedReview {
            review_id: 1000 + posts.len() as u64,
            state: "COMMENTED".to_string(),
            html_url: Some(format!(
                "https://github.com/octo/widgets/pull/{pr_number}#pullrequestreview-{}",
                1000 + posts.len()
            )),
        })
    }
}

/// Rubric that rejects the first `failures` drafts, then defers to [`DraftRubric`].
pub struct FlakyRubric {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyRubric {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Rubric for FlakyRubric {
    fn evaluate(&self, draft: &str) -> RubricVerdict {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return RubricVerdict {
                word_count: draft.split_whitespace().count(),
                problems: vec![format!("Rejected draft number {}.", call + 1)],
            };
        }
        DraftRubric.evaluate(draft)
    }
}

/// Owns everything a [`ToolContext`] borrows.
pub struct ToolHarness {
    pub gateway: MockGateway,
    pub state: RunStateStore,
    pub rubric: DraftRubric,
    pub post_guard: PostGuard,
}

impl ToolHarness {
    pub fn new() -> Self {
        Self {
            gateway: MockGateway::new(),
            state: RunStateStore::new(),
            rubric: DraftRubric,
            post_guard: PostGuard::new(),
        }
    }

    pub fn context(&self, caller: AgentKind) -> ToolContext<'_> {
        ToolContext {
            caller,
            pr_number: PR_NUMBER,
            gateway: &self.gateway,
            state: &self.state,
            rubric: &self.rubric,
            post_guard: &self.post_guard,
        }
    }
}
