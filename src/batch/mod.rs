//! Batch execution
//!
//! This module provides:
//! - SelectionSet: toggled (source, refinement) pairs
//! - BatchQueue: sources, refinement options and the current selection
//!   for one source-list run; `run_queues` dispatches several together
//! - BatchRun: concurrent jobs for one dispatch and their latest states
//! - BatchReport: counts derived from those states

pub mod queue;
pub mod report;
pub mod run;
pub mod selection;

pub use queue::{BatchQueue, BatchSettings, DEFAULT_MAX_SOURCE_CHARS, QueueEntry, run_queues};
pub use report::BatchReport;
pub use run::{BatchRun, JobUpdate};
pub use selection::{QueueKey, SelectionSet};
