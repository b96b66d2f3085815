use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span};

use casegen_core::{BatchConfig, BatchPlan, BatchRun, ConfigOverrides, StarCcmBuilder};
use casegen_model::JobOutcome;

use crate::cli::{CheckArgs, RunArgs};

const PROGRESS_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}";

pub fn run_cases(args: &RunArgs) -> Result<BatchRun> {
    let mut config = load_config(&args.config)?;
    config
        .apply_overrides(&ConfigOverrides {
            output_dir: args.output_dir.clone(),
            max_concurrency: args.max_concurrency,
            abort_on_error: args.abort_on_error,
        })
        .context("invalid command-line override")?;

    let span = info_span!("run", config = %config.source().display());
    let _guard = span.enter();

    let builder = StarCcmBuilder::from_settings(&config.builder);
    let plan = BatchPlan::load(&config)?;
    info!(
        cases = plan.len(),
        builder = builder.program(),
        max_concurrency = config.settings.max_concurrency,
        "starting batch"
    );

    let progress = progress_bar(plan.len());
    let run = plan.execute(&config, &builder, !args.no_report, |outcome| {
        report_progress(&progress, outcome);
    });
    progress.finish_and_clear();
    Ok(run?)
}

pub fn check_cases(args: &CheckArgs) -> Result<BatchPlan> {
    let config = load_config(&args.config)?;
    let span = info_span!("check", config = %config.source().display());
    let _guard = span.enter();
    Ok(BatchPlan::load(&config)?)
}

fn load_config(path: &Path) -> Result<BatchConfig> {
    BatchConfig::load(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))
}

fn progress_bar(len: usize) -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn report_progress(bar: &ProgressBar, outcome: &JobOutcome) {
    bar.inc(1);
    bar.set_message(outcome.case.name().to_string());
    if outcome.status.is_failed() {
        bar.println(format!("{}: {}", outcome.case.name(), outcome.status));
    }
}
