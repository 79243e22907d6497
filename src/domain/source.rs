//! Source records produced by the extractor

use serde::{Deserialize, Serialize};

/// One discrete candidate source extracted from generated text.
///
/// `label` is a short summary for scanning a list; `body` is the full text of
/// the source and is what gets submitted downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Position in the extracted sequence (0-based)
    pub index: usize,
    pub label: String,
    pub body: String,
}

impl SourceRecord {
    pub fn new(index: usize, label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            body: body.into(),
        }
    }
}
