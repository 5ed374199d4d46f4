//! Bulk ingestion pipeline
//!
//! A run is one linear batch:
//!
//! 1. Read the whole input and map rows to documents (no store calls yet)
//! 2. Apply the row policy: lenient runs skip and count bad rows, strict
//!    runs stop here if any row is bad
//! 3. Recreate the destination index (delete if present, then create)
//! 4. Submit the documents in bulk chunks, refreshing on the last one
//! 5. Fetch a small match-all sample as a sanity check
//!
//! Re-running always starts from an empty index, so the index reflects
//! exactly the latest input. Between steps 3 and 4 the index exists but is
//! empty, and during step 3 it briefly does not exist at all.
//!
//! Cancellation is checked between steps, never inside a store call. A
//! token cancelled before step 3 leaves the existing index untouched.

use serde::{Deserialize, Serialize};
use spark_common::store::{
    recreate_index, BulkOperation, BulkSummary, DocumentStore, IndexSettings, SearchQuery,
};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::document::{IngestedDocument, RowError};
use crate::error::{IngestError, IngestResult};
use crate::report::{IngestReport, MAX_REPORTED_ROW_ERRORS};
use crate::tabular::{TabularReader, TabularRow};

/// Default destination index
pub const DEFAULT_INDEX: &str = "titanic";

/// Default id column
pub const DEFAULT_ID_FIELD: &str = "passengerid";

/// Operations per bulk request
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Documents fetched by the verification search
pub const DEFAULT_SAMPLE_SIZE: usize = 2;

/// Cancellation stage in which nothing has been deleted yet
pub const BEFORE_RECREATE: &str = "before index recreate";

/// What to do with malformed rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Skip bad rows, count them in the report
    #[default]
    Lenient,
    /// Any bad row rejects the whole input before the index is touched
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub index: String,
    /// Column whose value becomes the document id. Matched case-insensitively.
    pub id_field: String,
    pub policy: RowPolicy,
    pub settings: IndexSettings,
    pub batch_size: usize,
    pub sample_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            policy: RowPolicy::default(),
            settings: IndexSettings::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> IngestResult<()> {
        if self.index.is_empty() || self.index != self.index.to_lowercase() {
            return Err(IngestError::InvalidOptions(format!(
                "index name '{}' must be non-empty and lowercase",
                self.index
            )));
        }
        if self.id_field.trim().is_empty() {
            return Err(IngestError::InvalidOptions("id field must not be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(IngestError::InvalidOptions(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.settings.shards == 0 {
            return Err(IngestError::InvalidOptions(
                "index needs at least one shard".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input mapped to bulk operations, not yet written
#[derive(Debug, Default)]
pub struct PreparedBatch {
    pub operations: Vec<BulkOperation>,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

/// Map every row to a document, applying the row policy
pub fn prepare<I>(headers: &[String], rows: I, options: &PipelineOptions) -> IngestResult<PreparedBatch>
where
    I: IntoIterator<Item = Result<TabularRow, RowError>>,
{
    let id_field = options.id_field.trim().to_lowercase();
    if !headers.iter().any(|h| *h == id_field) {
        return Err(IngestError::MissingIdColumn(id_field));
    }

    let mut batch = PreparedBatch::default();
    for row in rows {
        batch.rows_read += 1;
        match row.and_then(|r| IngestedDocument::from_row(headers, &r, &id_field)) {
            Ok(doc) => batch.operations.push(doc.into_bulk_operation(&options.index)),
            Err(err) => {
                if batch.row_errors.len() < MAX_REPORTED_ROW_ERRORS {
                    warn!(line = err.line(), error = %err, "Malformed row");
                }
                batch.row_errors.push(err);
            },
        }
    }

    if options.policy == RowPolicy::Strict {
        let count = batch.row_errors.len();
        if let Some(first) = batch.row_errors.clone().into_iter().next() {
            return Err(IngestError::InvalidRows { count, first });
        }
    }

    Ok(batch)
}

/// Loads tabular input into one destination index
pub struct IngestPipeline {
    store: Arc<dyn DocumentStore>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn DocumentStore>, options: PipelineOptions) -> Self {
        Self {
            store,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between steps once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Ingest a CSV file. Reading happens on the blocking pool.
    #[instrument(skip(self), fields(index = %self.options.index))]
    pub async fn ingest_path(&self, path: &Path) -> IngestResult<IngestReport> {
        self.options.validate()?;
        let started = Instant::now();
        let report = IngestReport::new(&self.options.index);

        let options = self.options.clone();
        let path = path.to_path_buf();
        let batch = tokio::task::spawn_blocking(move || {
            let (headers, rows) = TabularReader::from_path(&path)?.into_parts();
            prepare(&headers, rows, &options)
        })
        .await
        .map_err(|e| IngestError::Reader(e.to_string()))??;

        self.load(batch, report, started).await
    }

    /// Ingest CSV from an in-memory or otherwise cheap reader
    pub async fn ingest_reader<R: Read>(&self, reader: R) -> IngestResult<IngestReport> {
        self.options.validate()?;
        let started = Instant::now();
        let report = IngestReport::new(&self.options.index);

        let (headers, rows) = TabularReader::from_reader(reader)?.into_parts();
        let batch = prepare(&headers, rows, &self.options)?;

        self.load(batch, report, started).await
    }

    /// Ingest rows that are already split into cells
    pub async fn ingest<I>(&self, headers: &[String], rows: I) -> IngestResult<IngestReport>
    where
        I: IntoIterator<Item = TabularRow>,
    {
        self.options.validate()?;
        let started = Instant::now();
        let report = IngestReport::new(&self.options.index);

        let headers = crate::tabular::normalize_headers(headers)?;
        let batch = prepare(&headers, rows.into_iter().map(Ok), &self.options)?;

        self.load(batch, report, started).await
    }

    fn checkpoint(&self, stage: &'static str) -> IngestResult<()> {
        if self.cancel.is_cancelled() {
            warn!(stage, "Ingestion cancelled");
            return Err(IngestError::Cancelled { stage });
        }
        Ok(())
    }

    async fn load(
        &self,
        batch: PreparedBatch,
        mut report: IngestReport,
        started: Instant,
    ) -> IngestResult<IngestReport> {
        let index = self.options.index.as_str();
        let store = self.store.as_ref();

        report.rows_read = batch.rows_read;
        for err in &batch.row_errors {
            report.record_row_error(err);
        }
        info!(
            rows = report.rows_read,
            documents = batch.operations.len(),
            failed = report.rows_failed,
            "Input prepared"
        );

        self.checkpoint(BEFORE_RECREATE)?;
        recreate_index(store, index, &self.options.settings).await?;

        let mut written = BulkSummary::default();
        let chunks: Vec<&[BulkOperation]> = batch.operations.chunks(self.options.batch_size).collect();
        let total = chunks.len();

        for (i, chunk) in chunks.into_iter().enumerate() {
            self.checkpoint("during bulk write")?;

            let refresh = i + 1 == total;
            let summary = store.bulk_write(chunk, refresh).await?;
            debug!(
                chunk = i + 1,
                chunks = total,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Bulk chunk submitted"
            );
            for failure in summary.failures.iter().take(MAX_REPORTED_ROW_ERRORS) {
                warn!(
                    id = %failure.id,
                    status = failure.status,
                    reason = %failure.reason,
                    "Document rejected by store"
                );
            }
            written.merge(summary);
        }

        report.documents_written = written.succeeded;
        report.bulk_failures = written.failed;

        if self.options.sample_size > 0 {
            self.checkpoint("before verification")?;
            let hits = store
                .search(index, &SearchQuery::MatchAll, self.options.sample_size)
                .await?;
            report.sample = hits.into_iter().map(|hit| hit.source).collect();
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(run_id = %report.run_id, "{}", report);

        Ok(report)
    }
}
