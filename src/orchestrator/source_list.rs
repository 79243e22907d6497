//! Output of a completed source-list generation run

use serde_json::Value;

use crate::domain::{Enrichment, EnrichmentTable, JobState, JobStatus, SourceRecord, parse_table};
use crate::enrich::find_enrichment;
use crate::extract::{SourceExtractor, extract};

/// Raw generated text plus the URL enrichments computed alongside it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceListOutput {
    pub text: String,
    pub enrichments: EnrichmentTable,
}

impl SourceListOutput {
    /// Read `source_list_output` and `url_enrichments` from a run result.
    ///
    /// `url_enrichments` may be an object or a JSON-encoded string; anything
    /// unreadable yields an empty table.
    pub fn from_result(result: &Value) -> Self {
        let text = result
            .get("source_list_output")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let enrichments = match result.get("url_enrichments") {
            Some(Value::String(raw)) if !raw.trim().is_empty() => parse_table(raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable url_enrichments");
                EnrichmentTable::new()
            }),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable url_enrichments");
                EnrichmentTable::new()
            }),
            _ => EnrichmentTable::new(),
        };

        Self { text, enrichments }
    }

    /// Output of a completed job, `None` for any other state
    pub fn from_state(state: &JobState) -> Option<Self> {
        if state.status != JobStatus::Completed {
            return None;
        }
        state.result.as_ref().map(Self::from_result)
    }

    /// Sources extracted with the default cascade
    pub fn sources(&self) -> Vec<SourceRecord> {
        extract(&self.text)
    }

    pub fn sources_with(&self, extractor: &SourceExtractor) -> Vec<SourceRecord> {
        extractor.extract(&self.text)
    }

    pub fn enrichment_for(&self, record: &SourceRecord) -> Option<&Enrichment> {
        find_enrichment(&record.body, &self.enrichments)
    }
}
