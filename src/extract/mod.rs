//! Source extraction from loosely formatted generated text.
//!
//! The extractor is an ordered cascade of format detectors:
//! 1. grouped lists (`**List A: ...**` headers, one source per line)
//! 2. topics with numbered posts (`### Topic 1: ...`)
//! 3. blank-line separated blocks that look like sources
//!
//! The first detector that yields at least one source wins; formats are
//! never blended within one call. An empty result means the format was not
//! recognized and the caller should show the raw text instead.

pub mod blocks;
pub mod grouped;
pub mod text;
pub mod topic;

use std::sync::LazyLock;

use crate::domain::SourceRecord;

pub use blocks::{BlockExclusions, DEFAULT_BLOCK_EXCLUSIONS, FallbackBlockDetector};
pub use grouped::GroupedListDetector;
pub use topic::TopicPostDetector;

/// A source found by a detector, before it is numbered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub body: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: body.into(),
        }
    }
}

/// One text format the extractor understands.
pub trait Detector: Send + Sync {
    /// Short name of the format
    fn name(&self) -> &'static str;

    /// Candidates found in `text`, or `None` when the format's marker is absent.
    ///
    /// `Some(vec![])` means the marker was present but nothing parsed; the
    /// cascade moves on in both cases.
    fn detect(&self, text: &str) -> Option<Vec<Candidate>>;
}

/// Result of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Name of the detector that produced the records
    pub format: &'static str,
    pub records: Vec<SourceRecord>,
}

/// Ordered cascade of detectors
pub struct SourceExtractor {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for SourceExtractor {
    fn default() -> Self {
        Self::with_exclusions(BlockExclusions::default())
    }
}

impl SourceExtractor {
    /// Build an extractor from detectors, tried in the given order.
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// The standard cascade with a custom fallback exclusion list.
    pub fn with_exclusions(exclusions: BlockExclusions) -> Self {
        Self::new(vec![
            Box::new(GroupedListDetector),
            Box::new(TopicPostDetector),
            Box::new(FallbackBlockDetector::new(exclusions)),
        ])
    }

    /// Detector names in priority order
    pub fn formats(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Extract source records; empty when no format matched.
    pub fn extract(&self, text: &str) -> Vec<SourceRecord> {
        self.extract_with_format(text)
            .map(|e| e.records)
            .unwrap_or_default()
    }

    /// Extract source records and report which format matched.
    pub fn extract_with_format(&self, text: &str) -> Option<Extraction> {
        if text.is_empty() {
            return None;
        }

        self.detectors.iter().find_map(|detector| {
            let candidates = detector.detect(text)?;
            if candidates.is_empty() {
                return None;
            }
            let records = candidates
                .into_iter()
                .enumerate()
                .map(|(index, c)| SourceRecord::new(index, c.label, c.body))
                .collect();
            Some(Extraction {
                format: detector.name(),
                records,
            })
        })
    }
}

static DEFAULT_EXTRACTOR: LazyLock<SourceExtractor> = LazyLock::new(SourceExtractor::default);

/// Extract source records with the default cascade.
pub fn extract(text: &str) -> Vec<SourceRecord> {
    DEFAULT_EXTRACTOR.extract(text)
}
