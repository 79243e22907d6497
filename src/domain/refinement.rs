//! Refinement options offered by the surrounding application

use serde::{Deserialize, Serialize};

use crate::id::RefinementId;

/// Shown for a refinement without a name
pub const FALLBACK_REFINEMENT_NAME: &str = "Pipeline";

/// A downstream refinement treatment that can be applied to a source.
///
/// Opaque to the core beyond its identity and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementOption {
    pub id: RefinementId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RefinementOption {
    pub fn new(id: impl Into<RefinementId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name for display, never empty
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { FALLBACK_REFINEMENT_NAME } else { name }
    }
}
