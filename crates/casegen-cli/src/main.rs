//! Batch simulation case generator CLI.

use casegen_cli::exit::ExitStatus;
use casegen_cli::logging::{LogConfig, LogFormat, init_logging};
use casegen_core::BatchError;
use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{check_cases, run_cases};
use crate::summary::{print_plan, print_report, print_run_summary};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(ExitStatus::Fatal.code());
    }
    let status = match cli.command {
        Command::Run(args) => match run_cases(&args) {
            Ok(run) => {
                print_run_summary(&run);
                ExitStatus::from_batch(run.report.status())
            }
            Err(error) => {
                if let Some(BatchError::Scheduler(scheduler)) = error.downcast_ref::<BatchError>() {
                    print_report(scheduler.partial_report());
                }
                eprintln!("error: {error:#}");
                ExitStatus::Fatal
            }
        },
        Command::Check(args) => match check_cases(&args) {
            Ok(plan) => {
                print_plan(&plan);
                ExitStatus::from_check(plan.rejected())
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitStatus::Fatal
            }
        },
    };
    std::process::exit(status.code());
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
