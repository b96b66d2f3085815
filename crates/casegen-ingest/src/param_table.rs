//! CSV-backed parameter plan.
//!
//! The first non-blank record is the header; every following non-blank record
//! is one case. Short records are padded with empty cells and extra cells
//! beyond the header are ignored.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, warn};

use casegen_model::{ParamTable, Scalar};

use crate::error::{IngestError, Result};

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

/// Load a parameter plan from a CSV file.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed, has no header, or the header
/// contains empty or duplicate column names.
pub fn read_param_table(path: &Path) -> Result<ParamTable> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    collect_table(reader, path)
}

/// Load a parameter plan from any reader. `label` is used in error messages.
///
/// # Errors
///
/// Same conditions as [`read_param_table`].
pub fn read_param_table_from_reader<R: Read>(reader: R, label: &Path) -> Result<ParamTable> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    collect_table(reader, label)
}

fn collect_table<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<ParamTable> {
    let mut table: Option<ParamTable> = None;
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        match table.as_mut() {
            None => {
                let headers: Vec<String> = record.iter().map(normalize_header).collect();
                let created = ParamTable::new(headers).map_err(|source| IngestError::Table {
                    path: path.to_path_buf(),
                    source,
                })?;
                table = Some(created);
            }
            Some(table) => {
                let width = table.headers().len();
                if record.len() > width {
                    warn!(
                        path = %path.display(),
                        line = line + 1,
                        extra = record.len() - width,
                        "ignoring cells beyond the header"
                    );
                }
                let values: Vec<Option<Scalar>> = (0..width)
                    .map(|idx| record.get(idx).and_then(Scalar::parse_cell))
                    .collect();
                table
                    .push_row(values)
                    .map_err(|source| IngestError::Table {
                        path: path.to_path_buf(),
                        source,
                    })?;
            }
        }
    }
    let table = table.ok_or_else(|| IngestError::EmptyPlan {
        path: path.to_path_buf(),
    })?;
    debug!(
        path = %path.display(),
        columns = table.headers().len(),
        rows = table.len(),
        "parameter plan loaded"
    );
    Ok(table)
}
