//! Enrichment lookup for source bodies.
//!
//! A source body is matched to enrichment metadata through the first URL it
//! mentions. Matching is exact on the cleaned URL; there is no fuzzy or
//! partial matching.

pub mod urls;

use crate::domain::{Enrichment, EnrichmentTable};

pub use urls::{Segment, clean_url, extract_urls, first_url, linkify};

/// Enrichment for the first URL in `body`, if the table has an entry for it.
pub fn find_enrichment<'t>(body: &str, table: &'t EnrichmentTable) -> Option<&'t Enrichment> {
    if body.is_empty() || table.is_empty() {
        return None;
    }
    table.get(first_url(body)?)
}
