//! Domain types for Mimic
//!
//! This module contains the core data model:
//! - SourceRecord: one candidate source extracted from generated text
//! - Enrichment: metadata about a URL referenced by a source
//! - RefinementOption: a downstream treatment applied to a chosen source
//! - JobState: lifecycle of one remote pipeline run

pub mod enrichment;
pub mod job;
pub mod refinement;
pub mod source;

pub use enrichment::{Enrichment, EnrichmentTable, parse_table};
pub use job::{JobState, JobStatus, ValidationDecision};
pub use refinement::{FALLBACK_REFINEMENT_NAME, RefinementOption};
pub use source::SourceRecord;
