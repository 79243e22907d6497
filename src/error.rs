//! Error types for Mimic
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::remote::RemoteError;

/// All error types that can occur in Mimic
#[derive(Debug, Error)]
pub enum MimicError {
    /// Source index outside the extracted source list
    #[error("Unknown source: {0}")]
    UnknownSource(usize),

    /// Refinement option not offered to the queue
    #[error("Unknown refinement option: {0}")]
    UnknownRefinement(u64),

    /// Two batch queues drawn from the same source-list run
    #[error("Source-list run queued twice: {}", .0.map_or_else(|| "none".to_string(), |id| id.to_string()))]
    DuplicateParent(Option<u64>),

    /// A job state change that would move backwards or leave a terminal state
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    /// Remote pipeline call failed
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A spawned job task panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// A configured pattern did not compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Mimic operations
pub type Result<T> = std::result::Result<T, MimicError>;
