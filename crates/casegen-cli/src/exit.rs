//! Process exit codes.

use casegen_model::BatchStatus;

/// Exit status of the `casegen` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every case succeeded or was skipped.
    Success,
    /// At least one case failed.
    CasesFailed,
    /// Dispatch stopped under the abort policy.
    Aborted,
    /// Configuration error or a failure of the batch itself.
    Fatal,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::CasesFailed => 1,
            Self::Aborted => 2,
            Self::Fatal => 3,
        }
    }

    pub fn from_batch(status: BatchStatus) -> Self {
        match status {
            BatchStatus::AllDone => Self::Success,
            BatchStatus::PartiallyFailed => Self::CasesFailed,
            BatchStatus::Aborted => Self::Aborted,
        }
    }

    /// `check` fails when any row could not be prepared.
    pub fn from_check(rejected: usize) -> Self {
        if rejected == 0 {
            Self::Success
        } else {
            Self::CasesFailed
        }
    }
}
