//! Data model shared by every casegen crate.

pub mod case;
pub mod error;
pub mod options;
pub mod outcome;
pub mod scalar;
pub mod table;
pub mod template;

pub use case::{CaseId, CaseNaming, DEFAULT_CASE_PREFIX};
pub use error::{ConfigError, RenderError, RowError, TableError};
pub use options::{BatchStages, ExistingOutputPolicy, InFlightPolicy, StopPolicy};
pub use outcome::{BatchStatus, BatchSummary, JobOutcome, JobState, JobStatus};
pub use scalar::Scalar;
pub use table::{ParamTable, Row};
pub use template::{
    MACRO_TEMPLATE, SIM_TEMPLATE, TEMPLATE_PREFIX, Template, TemplateKind, TemplateRole,
    TemplateSet,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_every_status() {
        let naming = CaseNaming::for_batch("Case", 3);
        let outcomes = [
            JobOutcome::succeeded(naming.case_id(0)),
            JobOutcome::failed(naming.case_id(1), "exit code 1"),
            JobOutcome::skipped(naming.case_id(2), "aborted"),
        ];
        let summary = BatchSummary::from_outcomes(outcomes.iter());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.is_consistent());
    }

    #[test]
    fn outcome_serializes() {
        let outcome = JobOutcome::failed(CaseNaming::for_batch("Case", 1).case_id(0), "boom")
            .with_diagnostic("see Case1.log");
        let json = serde_json::to_string(&outcome).expect("serialize outcome");
        let round: JobOutcome = serde_json::from_str(&json).expect("deserialize outcome");
        assert_eq!(round, outcome);
        assert!(json.contains("\"failed\""));
    }
}
