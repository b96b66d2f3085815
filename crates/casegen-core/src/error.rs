use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use casegen_model::ConfigError;

use crate::report::BatchReport;

/// Failure of a single builder invocation.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("builder exited with {status}")]
    Failed {
        status: String,
        diagnostic: Option<String>,
    },

    #[error("builder timed out after {}s", .timeout.as_secs())]
    TimedOut { timeout: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("build input missing: {path}")]
    MissingInputs { path: PathBuf },

    #[error("builder I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Extra context worth attaching to the case outcome, such as the log tail.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Failed { diagnostic, .. } => diagnostic.as_deref(),
            _ => None,
        }
    }
}

/// Batch-fatal scheduler failures. Both carry the outcomes recorded so far.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn worker {index}: {source}")]
    WorkerSpawn {
        index: usize,
        #[source]
        source: std::io::Error,
        report: Box<BatchReport>,
    },

    #[error("worker channel closed with {pending} job(s) unaccounted for")]
    ChannelClosed {
        pending: usize,
        report: Box<BatchReport>,
    },
}

impl SchedulerError {
    pub fn partial_report(&self) -> &BatchReport {
        match self {
            Self::WorkerSpawn { report, .. } | Self::ChannelClosed { report, .. } => report,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write batch report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize batch report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that stop a batch before or while it runs.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
