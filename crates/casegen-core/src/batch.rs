//! End-to-end batch orchestration.
//!
//! [`BatchPlan::load`] performs every fail-fast check (configuration, plan
//! header, required templates) and prepares all jobs without touching the
//! output directory. [`BatchPlan::run`] hands the jobs to the scheduler.

use std::path::{Path, PathBuf};

use tracing::{info, info_span};

use casegen_ingest::{discover_templates, read_param_table};
use casegen_model::{
    BatchStages, ConfigError, JobOutcome, MACRO_TEMPLATE, SIM_TEMPLATE, TemplateSet,
};
use casegen_render::{JobFactory, OutputLayout, PreparedJob};

use crate::builder::CaseBuilder;
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::report::BatchReport;
use crate::scheduler::BatchScheduler;

/// Prepared jobs for one batch, in row order.
#[derive(Debug)]
pub struct BatchPlan {
    layout: OutputLayout,
    templates: TemplateSet,
    jobs: Vec<PreparedJob>,
}

impl BatchPlan {
    /// # Errors
    ///
    /// Returns [`BatchError::Config`] when the configuration, the parameter
    /// plan or the templates are unusable.
    pub fn load(config: &BatchConfig) -> Result<Self, BatchError> {
        let span = info_span!("plan", config = %config.source().display());
        let _guard = span.enter();

        let planner = config.planner()?;
        let plan_path = config.plan_path();
        let table = read_param_table(&plan_path).map_err(|error| ConfigError::ParamPlan {
            message: error.to_string(),
        })?;
        planner.check_header(table.headers())?;

        let template_dir = config.template_dir();
        let templates = discover_templates(&template_dir).map_err(|error| {
            ConfigError::Templates {
                message: error.to_string(),
            }
        })?;
        check_required_templates(&templates, config.stages, &template_dir)?;

        let layout = OutputLayout::new(config.output_dir());
        let factory = JobFactory::new(
            &planner,
            &templates,
            &layout,
            config.stages,
            config.case_naming(table.len()),
        );
        let jobs = factory.prepare_all(&table);
        let plan = Self {
            layout,
            templates,
            jobs,
        };
        info!(
            plan = %plan_path.display(),
            cases = plan.len(),
            rejected = plan.rejected(),
            templates = plan.templates.len(),
            output = %plan.layout.root().display(),
            "batch planned"
        );
        Ok(plan)
    }

    pub fn jobs(&self) -> &[PreparedJob] {
        &self.jobs
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Rows that failed planning or rendering.
    pub fn rejected(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| matches!(job, PreparedJob::Rejected { .. }))
            .count()
    }

    /// Create the output root and run every job.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchError`] when the output root cannot be created or the
    /// scheduler fails.
    pub fn run<B, F>(
        self,
        config: &BatchConfig,
        builder: &B,
        observer: F,
    ) -> Result<BatchReport, BatchError>
    where
        B: CaseBuilder + ?Sized,
        F: FnMut(&JobOutcome),
    {
        let root = self.layout.root();
        std::fs::create_dir_all(root).map_err(|source| BatchError::OutputDir {
            path: root.to_path_buf(),
            source,
        })?;
        let scheduler = BatchScheduler::new(config.scheduler_options());
        Ok(scheduler.run_with_observer(self.jobs, builder, observer)?)
    }

    /// [`run`](Self::run), then write `batch_report.json` when `write_report` is set.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run), or [`BatchError::Report`] when the report cannot
    /// be written.
    pub fn execute<B, F>(
        self,
        config: &BatchConfig,
        builder: &B,
        write_report: bool,
        observer: F,
    ) -> Result<BatchRun, BatchError>
    where
        B: CaseBuilder + ?Sized,
        F: FnMut(&JobOutcome),
    {
        let output_dir = self.layout.root().to_path_buf();
        let report_target = self.layout.report_path();
        let report = self.run(config, builder, observer)?;
        let report_path = if write_report {
            report.write_json(&report_target)?;
            info!(path = %report_target.display(), "batch report written");
            Some(report_target)
        } else {
            None
        };
        Ok(BatchRun {
            report,
            output_dir,
            report_path,
        })
    }
}

/// Result of [`BatchPlan::execute`].
#[derive(Debug)]
pub struct BatchRun {
    pub report: BatchReport,
    pub output_dir: PathBuf,
    /// Set when the report was written.
    pub report_path: Option<PathBuf>,
}

/// Plan, run and optionally persist the report for one batch.
///
/// # Errors
///
/// See [`BatchPlan::load`] and [`BatchPlan::execute`].
pub fn run_batch<B, F>(
    config: &BatchConfig,
    builder: &B,
    write_report: bool,
    observer: F,
) -> Result<BatchRun, BatchError>
where
    B: CaseBuilder + ?Sized,
    F: FnMut(&JobOutcome),
{
    BatchPlan::load(config)?.execute(config, builder, write_report, observer)
}

fn check_required_templates(
    templates: &TemplateSet,
    stages: BatchStages,
    dir: &Path,
) -> Result<(), ConfigError> {
    if !stages.needs_required_templates() {
        return Ok(());
    }
    if templates.macro_template.is_none() {
        return Err(ConfigError::MissingTemplate {
            name: MACRO_TEMPLATE.to_string(),
            dir: dir.to_path_buf(),
        });
    }
    if templates.sim_template.is_none() {
        return Err(ConfigError::MissingTemplate {
            name: SIM_TEMPLATE.to_string(),
            dir: dir.to_path_buf(),
        });
    }
    Ok(())
}
