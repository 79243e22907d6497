//! Aggregate view of a batch run

use std::fmt;

use serde::Serialize;

use crate::domain::{JobState, JobStatus, ValidationDecision};

/// Counts derived from the current job states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub completed: usize,
    /// Starting or Running
    pub running: usize,
    pub failed: usize,
    /// Completed runs the validator approved
    pub approved: usize,
    /// Completed runs with any other decision
    pub rejected: usize,
    /// True when every job is Completed or Failed (also for an empty batch)
    pub all_terminal: bool,
}

impl BatchReport {
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a JobState>) -> Self {
        let mut report = BatchReport::default();
        for state in states {
            report.total += 1;
            match state.status {
                JobStatus::Starting | JobStatus::Running => report.running += 1,
                JobStatus::Failed => report.failed += 1,
                JobStatus::Completed => {
                    report.completed += 1;
                    match state.decision() {
                        Some(ValidationDecision::Approve) => report.approved += 1,
                        _ => report.rejected += 1,
                    }
                }
            }
        }
        report.all_terminal = report.running == 0;
        report
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} approved, {} rejected, {} failed",
            self.approved, self.rejected, self.failed
        )?;
        if self.running > 0 {
            write!(f, ", {} running", self.running)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::RunId;
    use serde_json::json;

    fn completed(decision: Option<&str>) -> JobState {
        let mut state = JobState::starting();
        state.mark_running(RunId(1)).unwrap();
        let result = match decision {
            Some(d) => json!({"validation_decision": d}),
            None => json!({}),
        };
        state.mark_completed(result).unwrap();
        state
    }

    fn failed() -> JobState {
        let mut state = JobState::starting();
        state.mark_failed("boom", None).unwrap();
        state
    }

    #[test]
    fn test_empty_batch_is_all_terminal() {
        let report = BatchReport::from_states(std::iter::empty());
        assert_eq!(report.total, 0);
        assert!(report.all_terminal);
    }

    #[test]
    fn test_counts() {
        let mut running = JobState::starting();
        running.mark_running(RunId(2)).unwrap();
        let states = vec![
            completed(Some("APPROVE")),
            completed(Some("REJECT")),
            completed(None),
            failed(),
            JobState::starting(),
            running,
        ];
        let report = BatchReport::from_states(&states);
        assert_eq!(report.total, 6);
        assert_eq!(report.completed, 3);
        assert_eq!(report.approved, 1);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.running, 2);
        assert!(!report.all_terminal);
    }

    #[test]
    fn test_all_terminal_with_failures() {
        let states = vec![completed(Some("APPROVE")), failed()];
        let report = BatchReport::from_states(&states);
        assert!(report.all_terminal);
        assert_eq!(report.to_string(), "1 approved, 0 rejected, 1 failed");
    }

    #[test]
    fn test_display_mentions_running() {
        let states = vec![JobState::starting()];
        assert_eq!(
            BatchReport::from_states(&states).to_string(),
            "0 approved, 0 rejected, 0 failed, 1 running"
        );
    }
}
