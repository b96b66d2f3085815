//! Batch orchestration for casegen.
//!
//! Turns a prepared set of case jobs into outcomes: a bounded pool of workers
//! materialises each case and drives the external builder through the
//! [`CaseBuilder`] seam, while [`BatchReport`] aggregates the results.

pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod starccm;

pub use batch::{BatchPlan, BatchRun, run_batch};
pub use builder::{BuildOutput, BuildRequest, CancelToken, CaseBuilder};
pub use config::{BatchConfig, BuilderSettings, ConfigOverrides, DEFAULT_CONFIG_FILE, Settings};
pub use error::{BatchError, BuildError, ReportError, SchedulerError};
pub use report::{BatchReport, ReportDocument};
pub use scheduler::{
    ABORTED_REASON, BatchScheduler, CANCELLED_REASON, EXISTING_OUTPUTS_REASON,
    PREREQUISITES_REASON, SchedulerOptions,
};
pub use starccm::StarCcmBuilder;
