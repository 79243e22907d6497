//! A dispatched batch: the single owner of every job's latest state
//!
//! Jobs run on their own tasks and send `JobUpdate`s over a channel. Only
//! `BatchRun` touches the state map, and every change is a replace of one
//! key. Updates from a handle that no longer owns its key (cancelled, or
//! replaced) are dropped.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::queue::QueueEntry;
use super::report::BatchReport;
use super::selection::QueueKey;
use crate::domain::JobState;
use crate::error::Result;
use crate::orchestrator::{JobHandle, JobOrchestrator, JobOutcome, RunKind};
use crate::remote::{PipelineApi, RunRequest};

/// State change reported by one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub key: QueueKey,
    /// Id of the handle the job was launched with
    pub job: u64,
    pub state: JobState,
}

pub struct BatchRun {
    entries: Vec<QueueEntry>,
    states: BTreeMap<QueueKey, JobState>,
    active: HashMap<QueueKey, JobHandle>,
    cancel: CancellationToken,
    update_tx: mpsc::UnboundedSender<JobUpdate>,
    update_rx: mpsc::UnboundedReceiver<JobUpdate>,
    tasks: Vec<JoinHandle<Result<JobOutcome>>>,
}

impl Default for BatchRun {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRun {
    pub fn new() -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            entries: Vec::new(),
            states: BTreeMap::new(),
            active: HashMap::new(),
            cancel: CancellationToken::new(),
            update_tx,
            update_rx,
            tasks: Vec::new(),
        }
    }

    /// Start one job for `entry`; any job already owning its key is cancelled.
    pub fn launch<A>(&mut self, entry: QueueEntry, request: RunRequest, orchestrator: &JobOrchestrator<A>)
    where
        A: PipelineApi + ?Sized + 'static,
    {
        let key = entry.key;
        let handle = JobHandle::child_of(&self.cancel);
        if let Some(previous) = self.active.insert(key, handle.clone()) {
            previous.cancel();
        }
        self.states.insert(key, JobState::starting());
        self.entries.retain(|e| e.key != key);
        self.entries.push(entry);

        let orchestrator = orchestrator.clone();
        let tx = self.update_tx.clone();
        let task = tokio::spawn(async move {
            let job = handle.id();
            orchestrator
                .run(RunKind::Refinement(request), &handle, |state| {
                    let _ = tx.send(JobUpdate {
                        key,
                        job,
                        state: state.clone(),
                    });
                })
                .await
        });
        self.tasks.push(task);
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn states(&self) -> &BTreeMap<QueueKey, JobState> {
        &self.states
    }

    pub fn state(&self, key: &QueueKey) -> Option<&JobState> {
        self.states.get(key)
    }

    /// Counts over the current states
    pub fn report(&self) -> BatchReport {
        BatchReport::from_states(self.states.values())
    }

    pub fn is_done(&self) -> bool {
        self.report().all_terminal
    }

    /// Apply one update. Returns false if it was stale and ignored.
    pub fn apply(&mut self, update: JobUpdate) -> bool {
        let owner = self.active.get(&update.key);
        if owner.is_none_or(|h| h.id() != update.job || h.is_cancelled()) {
            tracing::debug!(key = %update.key, job = update.job, "Dropping stale job update");
            return false;
        }
        if self.states.get(&update.key).is_some_and(JobState::is_terminal) {
            tracing::debug!(key = %update.key, "Ignoring update after terminal state");
            return false;
        }

        if update.state.is_terminal() {
            tracing::info!(key = %update.key, status = %update.state.status, "Job finished");
        }
        self.states.insert(update.key, update.state);
        true
    }

    /// Wait for the next applied state change.
    ///
    /// Returns `None` once the batch is done or stopped.
    pub async fn next_update(&mut self) -> Option<(QueueKey, JobState)> {
        while !self.is_done() && !self.cancel.is_cancelled() {
            let update = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                update = self.update_rx.recv() => update?,
            };
            let key = update.key;
            if self.apply(update) {
                let state = self.states.get(&key)?.clone();
                return Some((key, state));
            }
        }
        None
    }

    /// Wait until every job is terminal (or the batch is stopped) and report.
    pub async fn wait(&mut self) -> BatchReport {
        while self.next_update().await.is_some() {}
        self.report()
    }

    /// Stop every job. Late responses are dropped.
    pub fn shutdown(&mut self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(jobs = self.active.len(), "Stopping batch");
        }
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for every job task to exit
    pub async fn join(&mut self) {
        for result in futures::future::join_all(self.tasks.drain(..)).await {
            if let Err(e) = result {
                tracing::error!(error = ?e, "Job task panicked");
            }
        }
    }
}

impl Drop for BatchRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobStatus;
    use crate::id::RunId;
    use crate::orchestrator::PollSettings;
    use crate::remote::{MockPipelineApi, MockRun};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(index: usize, body: &str) -> QueueEntry {
        QueueEntry {
            key: QueueKey::new(index, 1),
            source_label: body.to_string(),
            source_body: body.to_string(),
            refinement_name: "PAPA".to_string(),
        }
    }

    fn orchestrator(api: MockPipelineApi) -> JobOrchestrator<MockPipelineApi> {
        JobOrchestrator::new(Arc::new(api), PollSettings::with_interval(Duration::from_millis(5)))
    }

    #[tokio::test]
    async fn test_stale_update_is_dropped() {
        let orch = orchestrator(MockPipelineApi::new().with_run("a", MockRun::accepted()));
        let mut run = BatchRun::new();
        run.launch(entry(0, "a"), RunRequest::new("a", 1), &orch);

        let mut failed = JobState::starting();
        failed.mark_failed("late", None).unwrap();
        let stale = JobUpdate {
            key: QueueKey::new(0, 1),
            job: u64::MAX,
            state: failed,
        };
        assert!(!run.apply(stale));
        assert_eq!(run.state(&QueueKey::new(0, 1)).unwrap().status, JobStatus::Starting);
        run.shutdown();
    }

    #[tokio::test]
    async fn test_relaunch_replaces_owner() {
        let orch = orchestrator(MockPipelineApi::new().with_run("a", MockRun::accepted()));
        let mut run = BatchRun::new();
        run.launch(entry(0, "a"), RunRequest::new("a", 1), &orch);
        let first = run.active[&QueueKey::new(0, 1)].clone();
        run.launch(entry(0, "a"), RunRequest::new("a", 1), &orch);

        assert!(first.is_cancelled());
        assert_eq!(run.entries().len(), 1);

        let mut running = JobState::starting();
        running.mark_running(RunId(1)).unwrap();
        assert!(!run.apply(JobUpdate {
            key: QueueKey::new(0, 1),
            job: first.id(),
            state: running,
        }));
        run.shutdown();
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let orch = orchestrator(
            MockPipelineApi::new().with_run("a", MockRun::accepted().then_completed(json!({}))),
        );
        let mut run = BatchRun::new();
        run.launch(entry(0, "a"), RunRequest::new("a", 1), &orch);
        let report = run.wait().await;
        assert_eq!(report.completed, 1);

        let job = run.active[&QueueKey::new(0, 1)].id();
        let mut failed = JobState::starting();
        failed.mark_failed("late", None).unwrap();
        assert!(!run.apply(JobUpdate {
            key: QueueKey::new(0, 1),
            job,
            state: failed,
        }));
        assert_eq!(run.report().completed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_updates() {
        let orch = orchestrator(MockPipelineApi::new().with_run("a", MockRun::accepted()));
        let mut run = BatchRun::new();
        run.launch(entry(0, "a"), RunRequest::new("a", 1), &orch);
        run.shutdown();

        assert!(run.next_update().await.is_none());
        run.join().await;
        assert!(run.is_stopped());
        assert!(!run.report().all_terminal);
    }

    #[tokio::test]
    async fn test_empty_run_is_done() {
        let mut run = BatchRun::new();
        assert!(run.is_done());
        assert!(run.next_update().await.is_none());
    }
}
