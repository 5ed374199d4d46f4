//! Ingestion error types

use spark_common::StoreError;
use std::path::PathBuf;
use thiserror::Error;

use crate::document::RowError;

/// Result type alias for ingestion
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Failure that stops an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to open input {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read tabular input: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input has no header row")]
    EmptyHeader,

    #[error("Column '{0}' appears more than once in the header")]
    DuplicateColumn(String),

    #[error("Id field '{0}' is not a column of the input")]
    MissingIdColumn(String),

    #[error("{count} malformed row(s), first: {first}")]
    InvalidRows { count: usize, first: RowError },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Ingestion cancelled {stage}")]
    Cancelled { stage: &'static str },

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Input reader task failed: {0}")]
    Reader(String),
}
