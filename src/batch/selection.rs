//! Selected (source, refinement) pairs

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{RefinementId, RunId};

/// Identity of one queue entry.
///
/// Source indices restart at zero for every source-list run, so a key also
/// names the run its source came from when one is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RunId>,
    pub source_index: usize,
    pub refinement_id: RefinementId,
}

impl QueueKey {
    pub fn new(source_index: usize, refinement_id: impl Into<RefinementId>) -> Self {
        Self {
            parent: None,
            source_index,
            refinement_id: refinement_id.into(),
        }
    }

    pub fn with_parent(mut self, parent: RunId) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent {
            write!(f, "{}/", parent)?;
        }
        write!(f, "{}:{}", self.source_index, self.refinement_id)
    }
}

/// Set of selected pairs, ordered by source then refinement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    keys: BTreeSet<QueueKey>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` if absent, remove it if present. Returns true if now selected.
    pub fn toggle(&mut self, key: QueueKey) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    /// Returns true if `key` was not already selected
    pub fn insert(&mut self, key: QueueKey) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &QueueKey) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &QueueKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueKey> {
        self.keys.iter()
    }
}
