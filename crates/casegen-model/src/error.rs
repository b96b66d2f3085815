//! Error taxonomy.
//!
//! [`ConfigError`] halts a batch before anything is dispatched. [`RowError`]
//! and [`RenderError`] are scoped to a single job and end up as a failed
//! outcome for that case only.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no placeholders configured")]
    NoPlaceholders,

    #[error("placeholder listed twice: {placeholder}")]
    DuplicatePlaceholder { placeholder: String },

    #[error("placeholder has no column mapping: {placeholder}")]
    MissingMapping { placeholder: String },

    #[error("empty literal in {context}")]
    EmptyLiteral { context: String },

    #[error("literal is targeted by more than one rule: {literal}")]
    DuplicateLiteral { literal: String },

    #[error("placeholder uses a reserved literal: {literal}")]
    ReservedLiteral { literal: String },

    #[error("mapped columns missing from parameter plan header: {columns}")]
    MissingColumns { columns: String },

    #[error("invalid {setting}: {value} (must be at least 1)")]
    InvalidConcurrency { setting: &'static str, value: usize },

    #[error("invalid build timeout: must be greater than zero seconds")]
    InvalidTimeout,

    #[error("required template {name} not found in {dir}")]
    MissingTemplate { name: String, dir: PathBuf },

    #[error("failed to load parameter plan: {message}")]
    ParamPlan { message: String },

    #[error("failed to load templates: {message}")]
    Templates { message: String },
}

/// Per-row planning failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("column '{column}' for placeholder '{placeholder}' is missing from the row")]
    MissingColumn { placeholder: String, column: String },

    #[error("column '{column}' for placeholder '{placeholder}' has no value")]
    MissingValue { placeholder: String, column: String },

    #[error("value '{value}' in column '{column}' cannot be stringified")]
    Unstringifiable { column: String, value: String },

    #[error("literal '{literal}' has conflicting replacements '{first}' and '{second}'")]
    DuplicateLiteral {
        literal: String,
        first: String,
        second: String,
    },
}

/// Per-job rendering and materialisation failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to build substitution matcher: {0}")]
    Matcher(String),

    #[error("template {name} is not valid UTF-8")]
    NotUtf8 { name: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Parameter table shape errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("duplicate column in header: {column}")]
    DuplicateColumn { column: String },

    #[error("empty column name at position {index}")]
    EmptyColumn { index: usize },

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}
