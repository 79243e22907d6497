//! Remote pipeline layer
//!
//! This module provides:
//! - PipelineApi trait for the remote pipeline service
//! - HttpPipelineApi implementation over the service's JSON API
//! - MockPipelineApi, a scripted implementation for tests

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{PromptId, RefinementId, RunId};

pub use http::{HttpPipelineApi, HttpSettings};
pub use mock::{MockPipelineApi, MockRun};

/// Message used when a failed run does not say which step failed
pub const GENERIC_FAILURE: &str = "Pipeline failed";

/// Remote pipeline service. Each call is one request/response round trip.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Start a refinement run for one source
    async fn submit_run(&self, request: RunRequest) -> Result<RunId, RemoteError>;

    /// Start a source-list generation run from a prompt template
    async fn submit_source_list(&self, prompt_id: PromptId) -> Result<RunId, RemoteError>;

    /// Current status of a run
    async fn poll_status(&self, run_id: RunId) -> Result<PollResponse, RemoteError>;
}

/// Everything needed to start one refinement run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Source-list run the source was extracted from
    pub parent: Option<RunId>,
    pub source_body: String,
    pub refinement_id: RefinementId,
}

impl RunRequest {
    pub fn new(source_body: impl Into<String>, refinement_id: impl Into<RefinementId>) -> Self {
        Self {
            parent: None,
            source_body: source_body.into(),
            refinement_id: refinement_id.into(),
        }
    }

    pub fn with_parent(mut self, parent: RunId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Run status as reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Running,
    Completed,
    Failed,
}

impl RemoteStatus {
    /// Map a wire status string; anything unrecognized is still in progress.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" => RemoteStatus::Completed,
            "failed" => RemoteStatus::Failed,
            _ => RemoteStatus::Running,
        }
    }
}

/// One sub-step of a remote run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StepReport {
    pub fn completed() -> Self {
        Self {
            status: "completed".to_string(),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "failed".to_string(),
            error_message: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        RemoteStatus::from_wire(&self.status) == RemoteStatus::Failed
    }
}

/// Response to a status poll
#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse {
    pub status: RemoteStatus,
    pub steps: Vec<StepReport>,
    pub result: Option<Value>,
}

impl PollResponse {
    pub fn running() -> Self {
        Self {
            status: RemoteStatus::Running,
            steps: Vec::new(),
            result: None,
        }
    }

    pub fn completed(result: Value) -> Self {
        Self {
            status: RemoteStatus::Completed,
            steps: Vec::new(),
            result: Some(result),
        }
    }

    pub fn failed(steps: Vec<StepReport>) -> Self {
        Self {
            status: RemoteStatus::Failed,
            steps,
            result: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Error message of the first failed step, or the generic message.
    pub fn failure_message(&self) -> String {
        self.steps
            .iter()
            .find(|s| s.is_failed())
            .and_then(|s| s.error_message.clone())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string())
    }
}

/// Errors talking to the remote pipeline service
///
/// The display string is what ends up in a failed job's error message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Server did not return a story_id")]
    MissingRunId,
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
