//! Spark Jobs Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared building blocks for the Spark Jobs server and the bulk ingestion tool.
//!
//! # Overview
//!
//! - **Error Handling**: Typed document-store failures ([`StoreError`])
//! - **Logging**: Centralized `tracing` setup driven by environment variables
//! - **Store**: The [`store::DocumentStore`] capability with an Elasticsearch adapter
//!   and an in-memory adapter
//! - **Retry**: Bounded exponential backoff for connectivity failures
//!
//! # Example
//!
//! ```no_run
//! use spark_common::store::{self, IndexSettings, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StoreConfig::from_env()?;
//!     let store = store::connect(&config)?;
//!     store::ensure_index(store.as_ref(), "spark-jobs", &IndexSettings::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod retry;
pub mod store;

// Re-export commonly used types
pub use error::{StoreError, StoreResult};
pub use retry::RetryPolicy;
