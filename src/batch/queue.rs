//! Batch queue: pick (source, refinement) pairs, then launch them together

use std::collections::HashSet;

use serde::Serialize;

use super::run::BatchRun;
use super::selection::{QueueKey, SelectionSet};
use crate::domain::{RefinementOption, SourceRecord};
use crate::error::{MimicError, Result};
use crate::extract::text::truncate_chars;
use crate::id::{RefinementId, RunId};
use crate::orchestrator::JobOrchestrator;
use crate::remote::{PipelineApi, RunRequest};

/// Longest source body sent in one run request
pub const DEFAULT_MAX_SOURCE_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub max_source_chars: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_source_chars: DEFAULT_MAX_SOURCE_CHARS,
        }
    }
}

/// One selected pair, ready to dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub key: QueueKey,
    pub source_label: String,
    /// Source body, already truncated
    pub source_body: String,
    pub refinement_name: String,
}

/// Sources and refinement options from one source-list run, plus the
/// operator's selection among their pairs
#[derive(Debug, Clone)]
pub struct BatchQueue {
    parent: Option<RunId>,
    sources: Vec<SourceRecord>,
    refinements: Vec<RefinementOption>,
    selection: SelectionSet,
    settings: BatchSettings,
}

impl BatchQueue {
    pub fn new(sources: Vec<SourceRecord>, refinements: Vec<RefinementOption>) -> Self {
        Self {
            parent: None,
            sources,
            refinements,
            selection: SelectionSet::new(),
            settings: BatchSettings::default(),
        }
    }

    /// Source-list run the sources came from; sent with every run request
    pub fn with_parent(mut self, parent: RunId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_settings(mut self, settings: BatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn sources(&self) -> &[SourceRecord] {
        &self.sources
    }

    pub fn refinements(&self) -> &[RefinementOption] {
        &self.refinements
    }

    pub fn parent(&self) -> Option<RunId> {
        self.parent
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    fn source(&self, index: usize) -> Result<&SourceRecord> {
        self.sources
            .iter()
            .find(|s| s.index == index)
            .ok_or(MimicError::UnknownSource(index))
    }

    fn refinement(&self, id: RefinementId) -> Result<&RefinementOption> {
        self.refinements
            .iter()
            .find(|r| r.id == id)
            .ok_or(MimicError::UnknownRefinement(id.get()))
    }

    /// Key for a pair of this queue, tagged with the parent run
    fn pair(&self, source_index: usize, refinement_id: impl Into<RefinementId>) -> QueueKey {
        let key = QueueKey::new(source_index, refinement_id);
        match self.parent {
            Some(parent) => key.with_parent(parent),
            None => key,
        }
    }

    fn key(&self, source_index: usize, refinement_id: impl Into<RefinementId>) -> Result<QueueKey> {
        let key = self.pair(source_index, refinement_id);
        self.source(key.source_index)?;
        self.refinement(key.refinement_id)?;
        Ok(key)
    }

    /// Select the pair if it is not selected, deselect it otherwise.
    ///
    /// Returns true if the pair is selected afterwards.
    pub fn toggle(&mut self, source_index: usize, refinement_id: impl Into<RefinementId>) -> Result<bool> {
        let key = self.key(source_index, refinement_id)?;
        Ok(self.selection.toggle(key))
    }

    pub fn is_selected(&self, source_index: usize, refinement_id: impl Into<RefinementId>) -> bool {
        self.selection.contains(&self.pair(source_index, refinement_id))
    }

    /// Select every source with one refinement. Returns how many pairs were added.
    pub fn select_all(&mut self, refinement_id: impl Into<RefinementId>) -> Result<usize> {
        let refinement_id = self.refinement(refinement_id.into())?.id;
        let keys: Vec<QueueKey> = self
            .sources
            .iter()
            .map(|s| self.pair(s.index, refinement_id))
            .collect();
        Ok(keys.into_iter().filter(|k| self.selection.insert(*k)).count())
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    /// Entries for the current selection, bodies truncated to `max_source_chars`
    pub fn entries(&self) -> Result<Vec<QueueEntry>> {
        self.selection
            .iter()
            .map(|key| {
                let source = self.source(key.source_index)?;
                let refinement = self.refinement(key.refinement_id)?;
                Ok(QueueEntry {
                    key: *key,
                    source_label: source.label.clone(),
                    source_body: truncate_chars(&source.body, self.settings.max_source_chars).to_string(),
                    refinement_name: refinement.display_name().to_string(),
                })
            })
            .collect()
    }

    /// Launch one job per selected pair, all at once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run_all<A>(&self, orchestrator: &JobOrchestrator<A>) -> Result<BatchRun>
    where
        A: PipelineApi + ?Sized + 'static,
    {
        run_queues(std::slice::from_ref(self), orchestrator)
    }
}

/// Launch the selections of several queues, one per source-list run, as a
/// single batch.
///
/// Every queue is validated before anything is launched. Two queues with the
/// same parent would share keys and are rejected.
pub fn run_queues<A>(queues: &[BatchQueue], orchestrator: &JobOrchestrator<A>) -> Result<BatchRun>
where
    A: PipelineApi + ?Sized + 'static,
{
    let mut parents = HashSet::new();
    let mut planned = Vec::with_capacity(queues.len());
    for queue in queues {
        if !parents.insert(queue.parent) {
            return Err(MimicError::DuplicateParent(queue.parent.map(|p| p.get())));
        }
        planned.push((queue.parent, queue.entries()?));
    }

    let mut run = BatchRun::new();
    let mut jobs = 0;
    for (parent, entries) in planned {
        for entry in entries {
            let request = RunRequest {
                parent,
                source_body: entry.source_body.clone(),
                refinement_id: entry.key.refinement_id,
            };
            run.launch(entry, request, orchestrator);
            jobs += 1;
        }
    }
    tracing::info!(jobs, queues = queues.len(), "Batch dispatched");
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> BatchQueue {
        BatchQueue::new(
            vec![
                SourceRecord::new(0, "a", "A body"),
                SourceRecord::new(1, "b", "B".repeat(2500)),
                SourceRecord::new(2, "c", "C body"),
            ],
            vec![RefinementOption::new(4, "PAPA"), RefinementOption::new(5, "")],
        )
    }

    #[test]
    fn test_toggle_twice_on_empty_queue() {
        let mut queue = queue();
        assert!(queue.toggle(1, 4).unwrap());
        assert!(!queue.toggle(1, 4).unwrap());
        assert_eq!(queue.selected_count(), 0);
    }

    #[test]
    fn test_toggle_validates_pair() {
        let mut queue = queue();
        assert!(matches!(queue.toggle(9, 4), Err(MimicError::UnknownSource(9))));
        assert!(matches!(queue.toggle(0, 7), Err(MimicError::UnknownRefinement(7))));
        assert_eq!(queue.selected_count(), 0);
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut queue = queue();
        queue.toggle(0, 4).unwrap();
        assert_eq!(queue.select_all(4).unwrap(), 2);
        assert_eq!(queue.selected_count(), 3);
        assert!(queue.is_selected(2, 4));
        queue.clear();
        assert_eq!(queue.selected_count(), 0);
    }

    #[test]
    fn test_entries_truncate_body_and_name_refinement() {
        let mut queue = queue();
        queue.toggle(1, 5).unwrap();
        queue.toggle(0, 4).unwrap();

        let entries = queue.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, QueueKey::new(0, 4));
        assert_eq!(entries[0].refinement_name, "PAPA");
        assert_eq!(entries[1].source_body.chars().count(), 2000);
        assert_eq!(entries[1].refinement_name, "Pipeline");
    }

    #[test]
    fn test_keys_carry_parent_run() {
        let mut queue = queue().with_parent(RunId(7));
        queue.toggle(2, 4).unwrap();
        assert!(queue.is_selected(2, 4));
        assert!(!queue.selection().contains(&QueueKey::new(2, 4)));
        assert_eq!(queue.entries().unwrap()[0].key, QueueKey::new(2, 4).with_parent(RunId(7)));
    }

    #[test]
    fn test_custom_max_source_chars() {
        let mut queue = queue().with_settings(BatchSettings { max_source_chars: 3 });
        queue.toggle(0, 4).unwrap();
        assert_eq!(queue.entries().unwrap()[0].source_body, "A b");
    }
}
