//! Job state for one remote pipeline run
//!
//! A job only ever moves forward: `Starting -> Running -> {Completed | Failed}`,
//! or `Starting -> Failed` when the submission itself fails. Terminal states
//! never change again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MimicError, Result};
use crate::id::RunId;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Remote submission in flight
    Starting,
    /// Remote run accepted, polling for completion
    Running,
    /// Remote run reported completion
    Completed,
    /// Submission, polling, or the remote run failed
    Failed,
}

impl JobStatus {
    /// Returns true if no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval verdict carried by a completed refinement run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationDecision {
    Approve,
    Reject,
}

/// State of one launched run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Default for JobState {
    fn default() -> Self {
        Self::starting()
    }
}

impl JobState {
    /// Initial state: submission in flight
    pub fn starting() -> Self {
        Self {
            status: JobStatus::Starting,
            remote_run_id: None,
            error: None,
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Submission accepted; only valid from `Starting`.
    pub fn mark_running(&mut self, run_id: RunId) -> Result<()> {
        self.check(JobStatus::Running, &[JobStatus::Starting])?;
        self.status = JobStatus::Running;
        self.remote_run_id = Some(run_id);
        Ok(())
    }

    /// Remote run completed; only valid from `Running`.
    pub fn mark_completed(&mut self, result: Value) -> Result<()> {
        self.check(JobStatus::Completed, &[JobStatus::Running])?;
        self.status = JobStatus::Completed;
        self.result = Some(result);
        Ok(())
    }

    /// Job failed; valid from any non-terminal state.
    pub fn mark_failed(&mut self, error: impl Into<String>, result: Option<Value>) -> Result<()> {
        self.check(JobStatus::Failed, &[JobStatus::Starting, JobStatus::Running])?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        if result.is_some() {
            self.result = result;
        }
        Ok(())
    }

    /// Approval verdict from a completed run's result, if it carries one.
    ///
    /// Any decision other than APPROVE counts as a rejection.
    pub fn decision(&self) -> Option<ValidationDecision> {
        if self.status != JobStatus::Completed {
            return None;
        }
        let raw = self.result.as_ref()?.get("validation_decision")?.as_str()?;
        if raw.trim().eq_ignore_ascii_case("APPROVE") {
            Some(ValidationDecision::Approve)
        } else {
            Some(ValidationDecision::Reject)
        }
    }

    fn check(&self, to: JobStatus, allowed_from: &[JobStatus]) -> Result<()> {
        if allowed_from.contains(&self.status) {
            Ok(())
        } else {
            Err(MimicError::InvalidTransition {
                from: self.status.as_str(),
                to: to.as_str(),
            })
        }
    }
}
