use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CASE_PREFIX: &str = "Case";

/// Identifier of one generated case.
///
/// `seq` is the 1-based row position; `name` is the rendered label used for
/// file names and the `CaseName` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId {
    seq: usize,
    name: String,
}

impl CaseId {
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Naming scheme for the cases of one batch.
///
/// Sequence numbers are zero-padded to the digit count of the batch size, so
/// names sort in row order: 9 rows give `Case1`..`Case9`, 12 rows give
/// `Case01`..`Case12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseNaming {
    prefix: String,
    width: usize,
}

impl CaseNaming {
    pub fn for_batch(prefix: impl Into<String>, total: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width: total.max(1).to_string().len(),
        }
    }

    /// Identifier for the row at zero-based `position`.
    pub fn case_id(&self, position: usize) -> CaseId {
        let seq = position + 1;
        CaseId {
            seq,
            name: format!("{}{:0width$}", self.prefix, seq, width = self.width),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
