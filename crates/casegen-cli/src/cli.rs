//! CLI argument definitions for the case generator.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use casegen_core::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(
    name = "casegen",
    version,
    about = "Batch simulation case generator",
    long_about = "Expand a parameter plan into one simulation case per row.\n\n\
                  Each case gets its own directory with the rendered macro, a copy of\n\
                  the simulation file and any custom templates, then the external\n\
                  builder is run with bounded concurrency."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate and build every case in the parameter plan.
    Run(RunArgs),

    /// Validate the configuration, plan and templates without writing anything.
    Check(CheckArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Batch configuration file.
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output directory for case folders (default: `output_path` from the config).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of cases built at the same time.
    #[arg(long = "max-concurrency", value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Stop dispatching new cases after the first failure.
    #[arg(long = "abort-on-error")]
    pub abort_on_error: bool,

    /// Skip writing `batch_report.json`.
    #[arg(long = "no-report")]
    pub no_report: bool,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Batch configuration file.
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
