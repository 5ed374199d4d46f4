//! Spark Job Server Library
//!
//! HTTP server that records submitted Spark jobs in a document store.
//!
//! # Overview
//!
//! - **Submission**: `POST /submit` (and `POST /api/v1/jobs`) records a
//!   pending job and answers `202 Accepted` with the record
//! - **Lookup**: `GET /api/v1/jobs/:job_id` returns the stored record
//! - **Liveness**: `GET /` pings, `GET /health` probes the store
//!
//! Jobs are only recorded here. Running them belongs to a separate engine
//! that updates the record as it progresses.
//!
//! # Architecture
//!
//! Features are vertical slices (`features::jobs`) with commands, queries
//! and routes. Handlers receive a [`features::JobsContext`] holding the
//! store client and identifier generator, so tests swap in an in-memory
//! store.
//!
//! # Example
//!
//! ```no_run
//! use spark_server::{api, config::Config, features::JobsContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = spark_common::store::connect(&config.store)?;
//!     let ctx = JobsContext::new(store, config.jobs.index.clone());
//!     api::serve(config, ctx).await
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;

pub use error::AppError;
