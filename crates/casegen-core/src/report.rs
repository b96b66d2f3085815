//! Batch outcome aggregation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use casegen_model::{BatchStatus, BatchSummary, CaseId, JobOutcome};

use crate::error::ReportError;

/// Append-only record of job outcomes, safe to share between workers.
///
/// Each case is recorded at most once; a second outcome for the same case is
/// rejected and logged.
#[derive(Debug)]
pub struct BatchReport {
    started_at: DateTime<Utc>,
    state: Mutex<ReportState>,
}

#[derive(Debug, Default)]
struct ReportState {
    outcomes: BTreeMap<CaseId, JobOutcome>,
    aborted: bool,
    finished_at: Option<DateTime<Utc>>,
}

/// Serialized form written to `batch_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: BatchStatus,
    pub summary: BatchSummary,
    pub cases: Vec<JobOutcome>,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            state: Mutex::new(ReportState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReportState> {
        // Outcomes are inserted whole, so a poisoned lock still holds consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an outcome. Returns false if the case already has one.
    pub fn record(&self, outcome: JobOutcome) -> bool {
        let mut state = self.state();
        if let Some(existing) = state.outcomes.get(&outcome.case) {
            warn!(
                case = %outcome.case,
                kept = existing.status.label(),
                rejected = outcome.status.label(),
                "duplicate outcome ignored"
            );
            return false;
        }
        state.outcomes.insert(outcome.case.clone(), outcome);
        true
    }

    pub fn contains(&self, case: &CaseId) -> bool {
        self.state().outcomes.contains_key(case)
    }

    pub fn len(&self) -> usize {
        self.state().outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outcomes in case order.
    pub fn outcomes(&self) -> Vec<JobOutcome> {
        self.state().outcomes.values().cloned().collect()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_outcomes(self.state().outcomes.values())
    }

    pub fn mark_aborted(&self) {
        self.state().aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.state().aborted
    }

    pub fn status(&self) -> BatchStatus {
        let state = self.state();
        batch_status(state.aborted, &BatchSummary::from_outcomes(state.outcomes.values()))
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.state().finished_at
    }

    /// Stamp the finish time; later calls keep the first stamp.
    pub fn finish(&self) {
        let mut state = self.state();
        if state.finished_at.is_none() {
            state.finished_at = Some(Utc::now());
        }
    }

    pub fn document(&self) -> ReportDocument {
        let state = self.state();
        let cases: Vec<JobOutcome> = state.outcomes.values().cloned().collect();
        let summary = BatchSummary::from_outcomes(cases.iter());
        ReportDocument {
            started_at: self.started_at,
            finished_at: state.finished_at,
            status: batch_status(state.aborted, &summary),
            summary,
            cases,
        }
    }

    /// # Errors
    ///
    /// Returns a [`ReportError`] if the report cannot be serialized or written.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(&self.document())?;
        std::fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn batch_status(aborted: bool, summary: &BatchSummary) -> BatchStatus {
    if aborted {
        BatchStatus::Aborted
    } else if summary.failed > 0 {
        BatchStatus::PartiallyFailed
    } else {
        BatchStatus::AllDone
    }
}
