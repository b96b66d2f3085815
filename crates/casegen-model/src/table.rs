use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::TableError;
use crate::scalar::Scalar;

/// One case's parameter values, in header order.
///
/// Rows of the same [`ParamTable`] share their column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    position: usize,
    columns: Arc<[String]>,
    values: Vec<Option<Scalar>>,
}

impl Row {
    /// Zero-based position of this row in its table.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Value of `column`, or `None` when the column is absent or the cell is empty.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.column_index(column)
            .and_then(|idx| self.values.get(idx))
            .and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Scalar>)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(column, value)| (column.as_str(), value.as_ref()))
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }
}

/// Ordered parameter rows sharing a fixed header.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl ParamTable {
    /// Create an empty table.
    ///
    /// # Errors
    ///
    /// Fails when a column name is empty or appears twice.
    pub fn new(headers: Vec<String>) -> Result<Self, TableError> {
        let mut seen = BTreeSet::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                return Err(TableError::EmptyColumn { index: idx + 1 });
            }
            if !seen.insert(header.as_str()) {
                return Err(TableError::DuplicateColumn {
                    column: header.clone(),
                });
            }
        }
        Ok(Self {
            columns: headers.into(),
            rows: Vec::new(),
        })
    }

    /// Append a row. `values` must have one entry per column.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::RowWidth`] when the value count differs from the header.
    pub fn push_row(&mut self, values: Vec<Option<Scalar>>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len() + 1,
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.rows.push(Row {
            position: self.rows.len(),
            columns: Arc::clone(&self.columns),
            values,
        });
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    /// Rows in source order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
