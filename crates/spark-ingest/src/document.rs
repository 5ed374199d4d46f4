//! Row to document mapping
//!
//! Each cell is copied under its header name as a string. No types are
//! inferred. The id field must be present and non-empty; its value becomes
//! the document id in the destination index.

use serde_json::{Map, Value};
use spark_common::store::BulkOperation;
use thiserror::Error;

use crate::tabular::TabularRow;

/// Why a single row was not turned into a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("line {line}: expected {expected} cells, found {found}")]
    LengthMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: id field '{field}' is missing")]
    MissingId { line: u64, field: String },

    #[error("line {line}: id field '{field}' is empty")]
    EmptyId { line: u64, field: String },

    #[error("line {line}: unreadable row: {reason}")]
    Unreadable { line: u64, reason: String },
}

impl RowError {
    pub fn line(&self) -> u64 {
        match self {
            RowError::LengthMismatch { line, .. }
            | RowError::MissingId { line, .. }
            | RowError::EmptyId { line, .. }
            | RowError::Unreadable { line, .. } => *line,
        }
    }
}

/// One input row as a flat field map plus its document id
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedDocument {
    id: String,
    fields: Map<String, Value>,
}

impl IngestedDocument {
    /// Map `row` positionally onto `headers`
    pub fn from_row(headers: &[String], row: &TabularRow, id_field: &str) -> Result<Self, RowError> {
        if row.cells.len() != headers.len() {
            return Err(RowError::LengthMismatch {
                line: row.line,
                expected: headers.len(),
                found: row.cells.len(),
            });
        }

        let fields: Map<String, Value> = headers
            .iter()
            .zip(&row.cells)
            .map(|(header, cell)| (header.clone(), Value::String(cell.clone())))
            .collect();

        let id = match fields.get(id_field) {
            None => {
                return Err(RowError::MissingId {
                    line: row.line,
                    field: id_field.to_string(),
                })
            },
            Some(Value::String(id)) if id.trim().is_empty() => {
                return Err(RowError::EmptyId {
                    line: row.line,
                    field: id_field.to_string(),
                })
            },
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
        };

        Ok(Self { id, fields })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Index operation writing this document into `index`
    pub fn into_bulk_operation(self, index: &str) -> BulkOperation {
        BulkOperation::new(index, self.id, Value::Object(self.fields))
    }
}
