use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::agent::claude::LanguageModel;
use crate::agent::engine::{AgentEngine, AgentOutcome};
use crate::agent::prompt;
use crate::agent::roster::{AgentKind, Roster};
use crate::agent::tools::post_review::PostGuard;
use crate::agent::tools::ToolContext;
use crate::error::{AppError, Result};
use crate::platform::RepositoryGateway;
use crate::workflow::events::{EventSink, WorkflowEvent};
use crate::workflow::rubric::{DraftRubric, Rubric};
use crate::workflow::state::RunStateStore;
use crate::workflow::types::{Handoff, WorkflowBudget, WorkflowReport};

const DEFAULT_MAX_TURNS: u32 = 12;

/// Drives one review of one pull request, passing control between agents
/// until the review is posted.
pub struct Orchestrator {
    gateway: Arc<dyn RepositoryGateway>,
    model: Arc<dyn LanguageModel>,
    rubric: Arc<dyn Rubric>,
    roster: Roster,
    pr_number: u64,
    max_turns: u32,
    budget: WorkflowBudget,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn RepositoryGateway>,
        model: Arc<dyn LanguageModel>,
        pr_number: u64,
    ) -> Self {
        Self {
            gateway,
            model,
            rubric: Arc::new(DraftRubric),
            roster: Roster::new(),
            pr_number,
            max_turns: DEFAULT_MAX_TURNS,
            budget: WorkflowBudget::default(),
        }
    }

    pub fn with_rubric(mut self, rubric: Arc<dyn Rubric>) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn with_budget(mut self, budget: WorkflowBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Model calls allowed per agent activation.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Run the workflow to completion.
    ///
    /// Returns once the review is posted. Protocol violations, exhausted
    /// budgets, model failures and cancellation abort the run.
    pub async fn run(&self, events: &EventSink, cancel: &CancellationToken) -> Result<WorkflowReport> {
        let span = tracing::info_span!("review", pr = self.pr_number);

        match tokio::time::timeout(self.budget.wall_clock, self.drive(events, cancel))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::WorkflowBudgetExceeded(format!(
                "no review posted within {}s",
                self.budget.wall_clock.as_secs_f32()
            ))),
        }
    }

    async fn drive(&self, events: &EventSink, cancel: &CancellationToken) -> Result<WorkflowReport> {
        let started_at = chrono::Utc::now();
        let state = RunStateStore::new();
        let post_guard = PostGuard::new();
        let engine = AgentEngine::new(self.model.as_ref(), self.max_turns);

        let request = prompt::initial_request(self.pr_number);
        let mut input = request.clone();
        let mut active = AgentKind::ROOT;
        let mut handoffs: Vec<Handoff> = Vec::new();

        tracing::info!(agent = %active, "Starting review workflow");
        events.emit(WorkflowEvent::AgentSwitch { agent: active });

        loop {
            let ctx = ToolContext {
                caller: active,
                pr_number: self.pr_number,
                gateway: self.gateway.as_ref(),
                state: &state,
                rubric: self.rubric.as_ref(),
                post_guard: &post_guard,
            };

            let outcome = engine
                .run(self.roster.get(active), &input, &ctx, events, cancel)
                .instrument(tracing::info_span!("agent", name = %active))
                .await?;

            match outcome {
                AgentOutcome::Posted(review) => {
                    tracing::info!(
                        review_id = review.review_id,
                        handoffs = handoffs.len(),
                        "Review posted"
                    );
                    return Ok(WorkflowReport {
                        review,
                        state: state.into_inner(),
                        handoffs,
                        started_at,
                        finished_at: chrono::Utc::now(),
                    });
                }
                AgentOutcome::HandedOff { to, reason } => {
                    if !active.can_hand_off_to(to) {
                        return Err(AppError::ProtocolViolation(format!(
                            "{active} may not hand off to {to}"
                        )));
                    }
                    if handoffs.len() >= self.budget.max_handoffs as usize {
                        return Err(AppError::WorkflowBudgetExceeded(format!(
                            "{} handoffs without a posted review",
                            handoffs.len()
                        )));
                    }

                    tracing::info!(from = %active, to = %to, reason = %reason, "Handoff");
                    events.emit(WorkflowEvent::AgentSwitch { agent: to });

                    input = prompt::handoff_message(&request, active, &reason);
                    handoffs.push(Handoff {
                        from: active,
                        to,
                        reason,
                    });
                    active = to;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::agent::claude::MessageContent;
    use crate::testing::{passing_draft, tool_reply, FlakyRubric, MockGateway, ScriptedModel, PR_NUMBER};

    use crate::agent::roster::AgentKind::*;

    fn handoff(to: AgentKind, reason: &str) -> crate::agent::claude::MessagesResponse {
        tool_reply(&[("handoff", json!({ "to_agent": to.name(), "reason": reason }))])
    }

    fn save_draft(draft: &str) -> crate::agent::claude::MessagesResponse {
        tool_reply(&[("save_draft_comment_to_state", json!({ "draft_comment": draft }))])
    }

    fn post(draft: &str) -> crate::agent::claude::MessagesResponse {
        tool_reply(&[("post_final_review_to_github", json!({ "final_review_comment": draft }))])
    }

    /// ContextAgent reads the PR and its head commit, saves, hands back.
    fn script_context_agent(model: &ScriptedModel) {
        model.push(
            ContextAgent,
            tool_reply(&[
                ("get_pr_details", json!({ "pr_number": 42 })),
                ("get_commit_details", json!({ "head_sha": "abc123" })),
            ]),
        );
        model.push(
            ContextAgent,
            tool_reply(&[(
                "add_context_to_state",
                json!({ "gathered_contexts": "PR #42 \"Fix typo\" by alice. README.md modified: -foo +bar" }),
            )]),
        );
        model.push(ContextAgent, handoff(CommentorAgent, "Context gathered."));
    }

    fn orchestrator(gateway: &Arc<MockGateway>, model: &Arc<ScriptedModel>) -> Orchestrator {
        Orchestrator::new(gateway.clone(), model.clone(), PR_NUMBER)
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn event_agent(event: &WorkflowEvent) -> AgentKind {
        match event {
            WorkflowEvent::AgentSwitch { agent }
            | WorkflowEvent::ToolCallRequested { agent, .. }
            | WorkflowEvent::ToolCallResult { agent, .. }
            | WorkflowEvent::AgentOutput { agent, .. } => *agent,
        }
    }

    #[tokio::test]
    async fn test_posts_once_and_stops() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        let draft = passing_draft();

        model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Please draft a review for PR 42."));
        model.push(CommentorAgent, handoff(ContextAgent, "I need the PR details and changed files."));
        script_context_agent(&model);
        model.push(CommentorAgent, save_draft(&draft));
        model.push(CommentorAgent, handoff(ReviewAndPostingAgent, "Draft is ready."));
        model.push(ReviewAndPostingAgent, post(&draft));

        let (events, mut rx) = EventSink::channel();
        let report = orchestrator(&gateway, &model)
            .run(&events, &CancellationToken::new())
            .await
            .unwrap();

        let posts = gateway.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, 42);
        assert!(posts[0].1.contains("-foo") && posts[0].1.contains("+bar"));
        assert_eq!(report.review.review_id, 1001);
        assert!(report.review.html_url.is_some());

        assert_eq!(report.state.review_comment, draft);
        assert_eq!(report.state.final_review_comment, draft);
        assert!(report.state.gathered_contexts.contains("README.md"));
        assert_eq!(report.handoffs.len(), 4);

        // Nothing runs after the post
        assert_eq!(model.request_count(), 8);

        let first = &model.requests(ReviewAndPostingAgent)[0];
        assert!(matches!(&first.messages[0].content, MessageContent::Text(t) if t == "Write a review for PR: 42"));

        // Every switch precedes the first action of the new agent
        let events = drain(&mut rx);
        assert_eq!(events[0], WorkflowEvent::AgentSwitch { agent: ReviewAndPostingAgent });
        for (i, event) in events.iter().enumerate() {
            if let WorkflowEvent::AgentSwitch { agent } = event {
                assert_eq!(event_agent(&events[i + 1]), *agent);
            }
        }
        let switches: Vec<AgentKind> = events
            .iter()
            .filter_map(|e| match e {
                WorkflowEvent::AgentSwitch { agent } => Some(*agent),
                _ => None,
            })
            .collect();
        assert_eq!(
            switches,
            vec![ReviewAndPostingAgent, CommentorAgent, ContextAgent, CommentorAgent, ReviewAndPostingAgent]
        );
    }

    #[tokio::test]
    async fn test_rubric_failures_loop_back_to_drafter() {
        const FAILURES: usize = 3;

        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        let rubric = Arc::new(FlakyRubric::failing(FAILURES));
        let drafts: Vec<String> = (1..=FAILURES + 1)
            .map(|n| format!("{} Revision {n}.", passing_draft()))
            .collect();

        model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Please draft a review."));
        model.push(CommentorAgent, handoff(ContextAgent, "Need context."));
        script_context_agent(&model);
        for (i, draft) in drafts.iter().enumerate() {
            model.push(CommentorAgent, save_draft(draft));
            model.push(CommentorAgent, handoff(ReviewAndPostingAgent, "Draft is ready."));
            model.push(ReviewAndPostingAgent, post(draft));
            if i < FAILURES {
                model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Please address the rubric problems."));
            }
        }

        let report = orchestrator(&gateway, &model)
            .with_rubric(rubric.clone())
            .run(&EventSink::disabled(), &CancellationToken::new())
            .await
            .unwrap();

        // One initial request for a draft plus one per rejection
        assert_eq!(report.handoff_count(ReviewAndPostingAgent, CommentorAgent), FAILURES + 1);
        assert_eq!(rubric.calls(), FAILURES + 1);
        assert_eq!(report.state.final_review_comment, drafts[FAILURES]);
        assert_eq!(gateway.posts(), vec![(42, drafts[FAILURES].clone())]);

        for request in model.requests(ReviewAndPostingAgent) {
            assert!(request.system.contains("### final_review_comment\n(empty)"));
        }
    }

    #[tokio::test]
    async fn test_drafter_sees_latest_context() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        let draft = passing_draft();

        model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Draft please."));
        model.push(CommentorAgent, handoff(ContextAgent, "Need context."));
        model.push(
            ContextAgent,
            tool_reply(&[("add_context_to_state", json!({ "gathered_contexts": "stale partial notes" }))]),
        );
        model.push(
            ContextAgent,
            tool_reply(&[("add_context_to_state", json!({ "gathered_contexts": "complete notes" }))]),
        );
        model.push(ContextAgent, handoff(CommentorAgent, "Done."));
        model.push(CommentorAgent, save_draft(&draft));
        model.push(CommentorAgent, handoff(ReviewAndPostingAgent, "Ready."));
        model.push(ReviewAndPostingAgent, post(&draft));

        let report = orchestrator(&gateway, &model)
            .run(&EventSink::disabled(), &CancellationToken::new())
            .await
            .unwrap();

        let commentor = model.requests(CommentorAgent);
        let after_context = &commentor[1].system;
        assert!(after_context.contains("### gathered_contexts\ncomplete notes"));
        assert!(!after_context.contains("stale partial notes"));
        assert_eq!(report.state.gathered_contexts, "complete notes");
    }

    #[tokio::test]
    async fn test_reviewer_cannot_reach_context_agent() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        model.push(ReviewAndPostingAgent, handoff(ContextAgent, "Fetch the PR."));

        let (events, mut rx) = EventSink::channel();
        let err = orchestrator(&gateway, &model)
            .run(&events, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProtocolViolation(_)));
        assert!(model.requests(ContextAgent).is_empty());
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| *e == WorkflowEvent::AgentSwitch { agent: ContextAgent }));
    }

    #[tokio::test]
    async fn test_context_agent_cannot_reach_reviewer() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Draft please."));
        model.push(CommentorAgent, handoff(ContextAgent, "Need context."));
        model.push(ContextAgent, handoff(ReviewAndPostingAgent, "Here is the raw diff."));

        let err = orchestrator(&gateway, &model)
            .run(&EventSink::disabled(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProtocolViolation(_)));
        assert_eq!(model.requests(ReviewAndPostingAgent).len(), 1);
        assert!(gateway.posts().is_empty());
    }

    #[tokio::test]
    async fn test_second_post_is_protocol_violation() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        let draft = passing_draft();

        model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Draft please."));
        model.push(CommentorAgent, save_draft(&draft));
        model.push(CommentorAgent, handoff(ReviewAndPostingAgent, "Ready."));
        model.push(
            ReviewAndPostingAgent,
            tool_reply(&[
                ("post_final_review_to_github", json!({ "final_review_comment": draft })),
                ("post_final_review_to_github", json!({ "final_review_comment": draft })),
            ]),
        );

        let err = orchestrator(&gateway, &model)
            .run(&EventSink::disabled(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProtocolViolation(_)));
        assert_eq!(gateway.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_reviewer_must_wait_for_draft() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        let draft = passing_draft();

        model.push(ReviewAndPostingAgent, post(&draft));
        model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Draft please."));
        model.push(CommentorAgent, save_draft(&draft));
        model.push(CommentorAgent, handoff(ReviewAndPostingAgent, "Ready."));
        model.push(ReviewAndPostingAgent, post(&draft));

        let report = orchestrator(&gateway, &model)
            .run(&EventSink::disabled(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(gateway.posts().len(), 1);
        assert_eq!(report.handoffs.len(), 2);
    }

    #[tokio::test]
    async fn test_gateway_errors_stay_inside_agent() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        let draft = passing_draft();

        model.push(ReviewAndPostingAgent, handoff(CommentorAgent, "Draft please."));
        model.push(CommentorAgent, handoff(ContextAgent, "Need PR 7 and docs/guide.md."));
        model.push(
            ContextAgent,
            tool_reply(&[
                ("get_pr_details", json!({ "pr_number": 7 })),
                ("get_file_contents", json!({ "file_path": "docs/guide.md" })),
            ]),
        );
        script_context_agent(&model);
        model.push(CommentorAgent, save_draft(&draft));
        model.push(CommentorAgent, handoff(ReviewAndPostingAgent, "Ready."));
        model.push(ReviewAndPostingAgent, post(&draft));

        let (events, mut rx) = EventSink::channel();
        let report = orchestrator(&gateway, &model)
            .run(&events, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.review.review_id, 1001);
        let errors: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                WorkflowEvent::ToolCallResult {
                    agent: ContextAgent,
                    output,
                    is_error: true,
                    ..
                } => Some(output),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.contains("not found")));
    }

    #[tokio::test]
    async fn test_handoff_budget() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        model.repeat(ReviewAndPostingAgent, handoff(CommentorAgent, "Try again."));
        model.repeat(CommentorAgent, handoff(ReviewAndPostingAgent, "Here you go."));

        let err = orchestrator(&gateway, &model)
            .with_budget(WorkflowBudget {
                max_handoffs: 4,
                wall_clock: Duration::from_secs(30),
            })
            .run(&EventSink::disabled(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::WorkflowBudgetExceeded(_)));
        assert_eq!(model.request_count(), 5);
        assert!(gateway.posts().is_empty());
    }

    #[tokio::test]
    async fn test_wall_clock_budget() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::with_delay(Duration::from_secs(5)));
        model.repeat(ReviewAndPostingAgent, handoff(CommentorAgent, "Draft please."));

        let err = orchestrator(&gateway, &model)
            .with_budget(WorkflowBudget {
                max_handoffs: 16,
                wall_clock: Duration::from_millis(50),
            })
            .run(&EventSink::disabled(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::WorkflowBudgetExceeded(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator(&gateway, &model)
            .run(&EventSink::disabled(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_during_model_call() {
        let gateway = Arc::new(MockGateway::new());
        let model = Arc::new(ScriptedModel::with_delay(Duration::from_secs(5)));
        model.repeat(ReviewAndPostingAgent, handoff(CommentorAgent, "Draft please."));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orchestrator(&gateway, &model)
            .run(&EventSink::disabled(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Cancelled));
        assert!(gateway.posts().is_empty());
    }
}
