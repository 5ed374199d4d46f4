//! Spark Ingest Library
//!
//! Loads tabular (CSV) data into a search index, one document per row.
//!
//! # Modules
//!
//! - **tabular**: CSV reading with normalized headers
//! - **document**: row to document mapping and row validation
//! - **pipeline**: index recreation, bulk writes, verification
//! - **report**: what a run did
//!
//! # Example
//!
//! ```no_run
//! use spark_common::store::{connect, StoreConfig};
//! use spark_ingest::pipeline::{IngestPipeline, PipelineOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = connect(&StoreConfig::from_env()?)?;
//!     let pipeline = IngestPipeline::new(store, PipelineOptions::default());
//!     let report = pipeline.ingest_path(Path::new("titanic.csv")).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod document;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod tabular;

pub use document::{IngestedDocument, RowError};
pub use error::{IngestError, IngestResult};
pub use pipeline::{IngestPipeline, PipelineOptions, RowPolicy};
pub use report::IngestReport;
