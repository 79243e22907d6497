//! Scripted PipelineApi for tests and offline runs

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{PipelineApi, PollResponse, RemoteError, RunRequest, StepReport};
use crate::id::{PromptId, RunId};

/// Script for one remote run: how submission answers, then each poll in turn.
///
/// The last poll answer repeats once the script is exhausted; an empty poll
/// script keeps reporting `running`.
#[derive(Debug, Clone)]
pub struct MockRun {
    submit: Result<(), RemoteError>,
    polls: Vec<Result<PollResponse, RemoteError>>,
    delay: Duration,
}

impl MockRun {
    /// Submission succeeds
    pub fn accepted() -> Self {
        Self {
            submit: Ok(()),
            polls: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    /// Submission fails with `error`
    pub fn rejected(error: RemoteError) -> Self {
        Self {
            submit: Err(error),
            ..Self::accepted()
        }
    }

    pub fn then_running(mut self) -> Self {
        self.polls.push(Ok(PollResponse::running()));
        self
    }

    pub fn then_completed(mut self, result: Value) -> Self {
        self.polls.push(Ok(PollResponse::completed(result)));
        self
    }

    pub fn then_failed(mut self, steps: Vec<StepReport>) -> Self {
        self.polls.push(Ok(PollResponse::failed(steps)));
        self
    }

    pub fn then_poll_error(mut self, error: RemoteError) -> Self {
        self.polls.push(Err(error));
        self
    }

    /// Delay every call made for this run
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct ActiveRun {
    polls: VecDeque<Result<PollResponse, RemoteError>>,
    delay: Duration,
    poll_count: usize,
}

/// Mock pipeline service
///
/// Refinement runs are scripted by source body, source-list runs by prompt id.
pub struct MockPipelineApi {
    runs_by_body: HashMap<String, MockRun>,
    runs_by_prompt: HashMap<PromptId, MockRun>,
    next_id: AtomicU64,
    active: Mutex<HashMap<RunId, ActiveRun>>,
    submitted: Mutex<Vec<RunRequest>>,
}

impl Default for MockPipelineApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPipelineApi {
    pub fn new() -> Self {
        Self {
            runs_by_body: HashMap::new(),
            runs_by_prompt: HashMap::new(),
            next_id: AtomicU64::new(100),
            active: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Script the run started for a source body
    pub fn with_run(mut self, source_body: impl Into<String>, run: MockRun) -> Self {
        self.runs_by_body.insert(source_body.into(), run);
        self
    }

    /// Script the source-list run started for a prompt
    pub fn with_source_list(mut self, prompt_id: impl Into<PromptId>, run: MockRun) -> Self {
        self.runs_by_prompt.insert(prompt_id.into(), run);
        self
    }

    /// Requests passed to `submit_run`, in call order
    pub fn submitted(&self) -> Vec<RunRequest> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of polls received for a run
    pub fn poll_count(&self, run_id: RunId) -> usize {
        self.active
            .lock()
            .ok()
            .and_then(|a| a.get(&run_id).map(|r| r.poll_count))
            .unwrap_or(0)
    }

    /// Total polls received across all runs
    pub fn total_polls(&self) -> usize {
        self.active
            .lock()
            .map(|a| a.values().map(|r| r.poll_count).sum())
            .unwrap_or(0)
    }

    async fn start(&self, script: Option<&MockRun>, missing: &str) -> Result<RunId, RemoteError> {
        let Some(script) = script else {
            return Err(RemoteError::http(404, missing));
        };
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        script.submit.clone()?;

        let run_id = RunId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let run = ActiveRun {
            polls: script.polls.iter().cloned().collect(),
            delay: script.delay,
            poll_count: 0,
        };
        self.active
            .lock()
            .map_err(|_| RemoteError::Network("mock state poisoned".to_string()))?
            .insert(run_id, run);
        Ok(run_id)
    }
}

#[async_trait]
impl PipelineApi for MockPipelineApi {
    async fn submit_run(&self, request: RunRequest) -> Result<RunId, RemoteError> {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(request.clone());
        }
        self.start(self.runs_by_body.get(&request.source_body), "No mock run for source")
            .await
    }

    async fn submit_source_list(&self, prompt_id: PromptId) -> Result<RunId, RemoteError> {
        self.start(self.runs_by_prompt.get(&prompt_id), "Prompt not found")
            .await
    }

    async fn poll_status(&self, run_id: RunId) -> Result<PollResponse, RemoteError> {
        let (answer, delay) = {
            let mut active = self
                .active
                .lock()
                .map_err(|_| RemoteError::Network("mock state poisoned".to_string()))?;
            let run = active
                .get_mut(&run_id)
                .ok_or_else(|| RemoteError::http(404, "Story not found"))?;
            run.poll_count += 1;
            let answer = if run.polls.len() > 1 {
                run.polls.pop_front()
            } else {
                run.polls.front().cloned()
            };
            (answer.unwrap_or_else(|| Ok(PollResponse::running())), run.delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_polls_in_order_then_repeat_last() {
        let api = MockPipelineApi::new().with_run(
            "body",
            MockRun::accepted().then_running().then_completed(json!({"ok": true})),
        );
        let run_id = api.submit_run(RunRequest::new("body", 1)).await.unwrap();

        assert_eq!(api.poll_status(run_id).await.unwrap(), PollResponse::running());
        let done = PollResponse::completed(json!({"ok": true}));
        assert_eq!(api.poll_status(run_id).await.unwrap(), done);
        assert_eq!(api.poll_status(run_id).await.unwrap(), done);
        assert_eq!(api.poll_count(run_id), 3);
    }

    #[tokio::test]
    async fn test_rejected_submission() {
        let api = MockPipelineApi::new().with_run("body", MockRun::rejected(RemoteError::http(502, "down")));
        let err = api.submit_run(RunRequest::new("body", 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "down");
        assert_eq!(api.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_body_is_not_found() {
        let api = MockPipelineApi::new();
        let err = api.submit_run(RunRequest::new("other", 1)).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_unknown_run_poll_fails() {
        let api = MockPipelineApi::new();
        assert!(api.poll_status(RunId(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_source_list_by_prompt() {
        let api = MockPipelineApi::new().with_source_list(5, MockRun::accepted());
        let run_id = api.submit_source_list(PromptId(5)).await.unwrap();
        assert_eq!(api.poll_status(run_id).await.unwrap(), PollResponse::running());
        assert!(api.submit_source_list(PromptId(6)).await.is_err());
    }

    #[tokio::test]
    async fn test_run_ids_are_distinct() {
        let api = MockPipelineApi::new()
            .with_run("a", MockRun::accepted())
            .with_run("b", MockRun::accepted());
        let a = api.submit_run(RunRequest::new("a", 1)).await.unwrap();
        let b = api.submit_run(RunRequest::new("b", 1)).await.unwrap();
        assert_ne!(a, b);
    }
}
