//! Mimic - source list extraction and batch refinement orchestration
//!
//! Mimic turns loosely formatted generated text into discrete source records,
//! matches them to URL enrichment metadata, and drives remote refinement runs
//! for selected sources concurrently, reporting on the batch as it resolves.

pub mod batch;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod id;
pub mod orchestrator;
pub mod remote;

pub use error::{MimicError, Result};
