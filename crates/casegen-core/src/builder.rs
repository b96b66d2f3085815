//! The seam to the external case-building tool.
//!
//! The scheduler hands each job to a [`CaseBuilder`] as one blocking call.
//! Implementations must honour the [`CancelToken`] and the optional timeout
//! carried by the [`BuildRequest`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use casegen_model::CaseId;
use casegen_render::BuildInputs;

use crate::error::BuildError;

/// Batch-wide cancellation flag shared by every worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub case: &'a CaseId,
    pub inputs: &'a BuildInputs,
    /// Working directory of the build; every file it writes stays inside.
    pub case_dir: &'a Path,
    pub log_path: &'a Path,
    /// Internal parallelism passed through to the tool.
    pub parallelism_hint: usize,
    pub timeout: Option<Duration>,
    pub cancel: &'a CancelToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub exit_code: Option<i32>,
    pub log_path: Option<PathBuf>,
}

pub trait CaseBuilder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Build one case. Blocks until the tool finishes, fails, times out or
    /// observes cancellation.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] fails this case only.
    fn build(&self, request: &BuildRequest<'_>) -> Result<BuildOutput, BuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
