//! Job orchestration for remote pipeline runs
//!
//! A `JobOrchestrator` drives one run through its lifecycle: submit, poll at
//! a fixed interval until the remote side reports a terminal status, and
//! emit every state change. It owns no shared state; callers decide what to
//! do with the emitted states.

pub mod handle;
pub mod source_list;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::JobState;
use crate::error::{MimicError, Result};
use crate::id::{PromptId, RunId};
use crate::remote::{PipelineApi, RemoteError, RemoteStatus, RunRequest};

pub use handle::JobHandle;
pub use source_list::SourceListOutput;

/// Default delay between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollSettings {
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

/// What a job submits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunKind {
    /// Refine one source
    Refinement(RunRequest),
    /// Generate a source list from a prompt
    SourceList(PromptId),
}

/// How a job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Reached a terminal state
    Finished(JobState),
    /// Handle was cancelled first; nothing was emitted after cancellation
    Cancelled,
}

impl JobOutcome {
    pub fn state(&self) -> Option<&JobState> {
        match self {
            JobOutcome::Finished(state) => Some(state),
            JobOutcome::Cancelled => None,
        }
    }

    pub fn into_state(self) -> Option<JobState> {
        match self {
            JobOutcome::Finished(state) => Some(state),
            JobOutcome::Cancelled => None,
        }
    }
}

/// Drives one remote run at a time per call to `run`
pub struct JobOrchestrator<A: PipelineApi + ?Sized> {
    api: Arc<A>,
    settings: PollSettings,
}

impl<A: PipelineApi + ?Sized> Clone for JobOrchestrator<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            settings: self.settings,
        }
    }
}

impl<A: PipelineApi + ?Sized> JobOrchestrator<A> {
    pub fn new(api: Arc<A>, settings: PollSettings) -> Self {
        Self { api, settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    async fn submit(&self, kind: &RunKind) -> std::result::Result<RunId, RemoteError> {
        match kind {
            RunKind::Refinement(request) => self.api.submit_run(request.clone()).await,
            RunKind::SourceList(prompt_id) => self.api.submit_source_list(*prompt_id).await,
        }
    }

    /// Run a job to a terminal state, calling `emit` after every transition.
    ///
    /// Emits `Starting` first, then `Running` once the submission is accepted,
    /// then exactly one terminal state. Cancelling `handle` stops polling at
    /// the next suspension point; a response that arrives after cancellation
    /// is dropped without being emitted.
    pub async fn run<F>(&self, kind: RunKind, handle: &JobHandle, mut emit: F) -> Result<JobOutcome>
    where
        F: FnMut(&JobState),
    {
        if handle.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }

        let mut state = JobState::starting();
        emit(&state);

        let submitted = tokio::select! {
            biased;
            _ = handle.cancelled() => return Ok(JobOutcome::Cancelled),
            result = self.submit(&kind) => result,
        };
        if handle.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }

        let run_id = match submitted {
            Ok(run_id) => run_id,
            Err(e) => {
                tracing::warn!(job = handle.id(), error = %e, "Submission failed");
                state.mark_failed(e.to_string(), None)?;
                emit(&state);
                return Ok(JobOutcome::Finished(state));
            }
        };

        state.mark_running(run_id)?;
        tracing::debug!(job = handle.id(), run_id = %run_id, "Run accepted");
        emit(&state);

        loop {
            tokio::select! {
                biased;
                _ = handle.cancelled() => return Ok(JobOutcome::Cancelled),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }

            let polled = tokio::select! {
                biased;
                _ = handle.cancelled() => return Ok(JobOutcome::Cancelled),
                result = self.api.poll_status(run_id) => result,
            };
            if handle.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }

            match polled {
                Ok(response) => match response.status {
                    RemoteStatus::Running => continue,
                    RemoteStatus::Completed => {
                        tracing::info!(job = handle.id(), run_id = %run_id, "Run completed");
                        state.mark_completed(response.result.unwrap_or(Value::Null))?;
                    }
                    RemoteStatus::Failed => {
                        let message = response.failure_message();
                        tracing::warn!(job = handle.id(), run_id = %run_id, error = %message, "Run failed");
                        state.mark_failed(message, response.result)?;
                    }
                },
                Err(e) => {
                    tracing::warn!(job = handle.id(), run_id = %run_id, error = %e, "Poll failed");
                    state.mark_failed(e.to_string(), None)?;
                }
            }

            emit(&state);
            return Ok(JobOutcome::Finished(state));
        }
    }
}

impl<A: PipelineApi + ?Sized + 'static> JobOrchestrator<A> {
    /// Run a job on its own task, streaming state changes through a channel.
    pub fn spawn(&self, kind: RunKind) -> RunningJob {
        self.spawn_with(kind, JobHandle::new())
    }

    pub fn spawn_with(&self, kind: RunKind, handle: JobHandle) -> RunningJob {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.clone();
        let task_handle = handle.clone();
        let task = tokio::spawn(async move {
            orchestrator
                .run(kind, &task_handle, |state| {
                    let _ = tx.send(state.clone());
                })
                .await
        });

        RunningJob {
            handle,
            updates: rx,
            task,
        }
    }
}

/// A job running on its own task
pub struct RunningJob {
    handle: JobHandle,
    updates: mpsc::UnboundedReceiver<JobState>,
    task: JoinHandle<Result<JobOutcome>>,
}

impl RunningJob {
    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    /// Next state change, `None` once the job has stopped emitting
    pub async fn next_update(&mut self) -> Option<JobState> {
        self.updates.recv().await
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Wait for the task to end
    pub async fn finish(mut self) -> Result<JobOutcome> {
        (&mut self.task)
            .await
            .map_err(|e| MimicError::Task(e.to_string()))?
    }
}

impl Drop for RunningJob {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}
