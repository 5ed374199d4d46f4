//! Completion report for one ingestion run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Row errors kept in the report; the count is always exact
pub const MAX_REPORTED_ROW_ERRORS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub index: String,
    pub started_at: DateTime<Utc>,
    /// Data rows seen, valid or not
    pub rows_read: usize,
    /// Rows skipped as malformed
    pub rows_failed: usize,
    /// First few row errors, for the operator
    pub row_errors: Vec<String>,
    /// Documents the store acknowledged
    pub documents_written: usize,
    /// Documents the store rejected
    pub bulk_failures: usize,
    /// Verification search result
    pub sample: Vec<Value>,
    pub elapsed_ms: u64,
}

impl IngestReport {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            index: index.into(),
            started_at: Utc::now(),
            rows_read: 0,
            rows_failed: 0,
            row_errors: Vec::new(),
            documents_written: 0,
            bulk_failures: 0,
            sample: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn record_row_error(&mut self, error: impl ToString) {
        self.rows_failed += 1;
        if self.row_errors.len() < MAX_REPORTED_ROW_ERRORS {
            self.row_errors.push(error.to_string());
        }
    }

    /// Every row was valid and every document was accepted
    pub fn is_clean(&self) -> bool {
        self.rows_failed == 0 && self.bulk_failures == 0
    }
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "index '{}': {} rows read, {} failed, {} documents written, {} rejected by store ({} ms)",
            self.index,
            self.rows_read,
            self.rows_failed,
            self.documents_written,
            self.bulk_failures,
            self.elapsed_ms
        )
    }
}
