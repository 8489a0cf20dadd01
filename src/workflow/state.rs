use serde::Serialize;
use tokio::sync::Mutex;

/// Data threaded between agents during one workflow invocation.
///
/// Every write replaces a field wholesale; nothing is merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub gathered_contexts: String,
    pub review_comment: String,
    pub final_review_comment: String,
}

/// Exclusive accessor for [`RunState`].
#[derive(Debug, Default)]
pub struct RunStateStore {
    inner: Mutex<RunState>,
}

impl RunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `update` while holding exclusive access. No other reader sees the
    /// state until `update` returns.
    pub async fn edit<R>(&self, update: impl FnOnce(&mut RunState) -> R) -> R {
        let mut state = self.inner.lock().await;
        update(&mut state)
    }

    pub async fn snapshot(&self) -> RunState {
        self.inner.lock().await.clone()
    }

    pub fn into_inner(self) -> RunState {
        self.inner.into_inner()
    }
}
