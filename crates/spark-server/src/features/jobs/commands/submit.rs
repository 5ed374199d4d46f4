//! Submit job command
//!
//! Records a new job in the pending state. The caller supplies nothing:
//! id, progress and start time are all generated here.
//!
//! Steps:
//! 1. Make sure the jobs index exists (create-if-absent, retried on
//!    connectivity failures with bounded backoff)
//! 2. Draw a fresh identifier
//! 3. Build the pending record and write it under that identifier
//!
//! The write is a plain point write. If two jobs ever draw the same id the
//! later one replaces the earlier.

use chrono::Utc;
use mediator::Request;
use serde::{Deserialize, Serialize};
use spark_common::retry::retry;
use spark_common::store::ensure_index;
use spark_common::StoreError;
use tracing::info;

use crate::features::jobs::types::JobRecord;
use crate::features::jobs::JobsContext;

/// Command to submit a new job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitJobCommand {}

/// Errors that can occur when submitting a job
#[derive(Debug, thiserror::Error)]
pub enum SubmitJobError {
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode job record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Request<Result<JobRecord, SubmitJobError>> for SubmitJobCommand {}

#[tracing::instrument(skip(ctx, _command), fields(index = %ctx.index))]
pub async fn handle(
    ctx: &JobsContext,
    _command: SubmitJobCommand,
) -> Result<JobRecord, SubmitJobError> {
    let store = ctx.store.as_ref();
    let index = ctx.index.as_str();
    let settings = &ctx.settings;

    retry(&ctx.retry, "ensure_jobs_index", move || ensure_index(store, index, settings)).await?;

    let record = JobRecord::pending(ctx.ids.generate(), Utc::now());
    let body = serde_json::to_value(record.to_document())?;

    ctx.store.put_document(index, &record.id, &body).await?;

    info!(job_id = %record.id, "Job recorded");
    Ok(record)
}
