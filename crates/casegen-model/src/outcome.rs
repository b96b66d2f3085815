use std::fmt;

use serde::{Deserialize, Serialize};

use crate::case::CaseId;

/// Lifecycle of a single job inside the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Dispatched,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Dispatched => write!(f, "dispatched"),
            JobState::Running => write!(f, "running"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Final status of a job as recorded in the batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed(String),
    Skipped(String),
}

impl JobStatus {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Succeeded => None,
            Self::Failed(reason) | Self::Skipped(reason) => Some(reason),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{} ({reason})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub case: CaseId,
    pub status: JobStatus,
    /// Extra context such as the builder's output tail or log path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl JobOutcome {
    pub fn new(case: CaseId, status: JobStatus) -> Self {
        Self {
            case,
            status,
            diagnostic: None,
            elapsed_ms: 0,
        }
    }

    pub fn succeeded(case: CaseId) -> Self {
        Self::new(case, JobStatus::Succeeded)
    }

    pub fn failed(case: CaseId, reason: impl Into<String>) -> Self {
        Self::new(case, JobStatus::Failed(reason.into()))
    }

    pub fn skipped(case: CaseId, reason: impl Into<String>) -> Self {
        Self::new(case, JobStatus::Skipped(reason.into()))
    }

    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    #[must_use]
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a JobOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.total += 1;
            match outcome.status {
                JobStatus::Succeeded => summary.succeeded += 1,
                JobStatus::Failed(_) => summary.failed += 1,
                JobStatus::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn is_consistent(&self) -> bool {
        self.succeeded + self.failed + self.skipped == self.total
    }
}

/// Terminal state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// No job failed.
    AllDone,
    /// At least one job failed, every job was dispatched.
    PartiallyFailed,
    /// Dispatch stopped early under the abort policy.
    Aborted,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::AllDone => write!(f, "all done"),
            BatchStatus::PartiallyFailed => write!(f, "partially failed"),
            BatchStatus::Aborted => write!(f, "aborted"),
        }
    }
}
