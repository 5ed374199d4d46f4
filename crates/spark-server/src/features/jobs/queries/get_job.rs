//! Get job query
//!
//! Query to get a single job record by ID. Document lookups by id are
//! realtime in Elasticsearch, so a job is visible here as soon as its
//! submission returns.

use mediator::Request;
use serde::{Deserialize, Serialize};
use spark_common::StoreError;

use crate::features::jobs::types::{JobDocument, JobRecord};
use crate::features::jobs::JobsContext;

/// Query to get a job by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: String,
}

/// Error type for get job query
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Job '{0}' not found")]
    NotFound(String),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stored job record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Request<Result<JobRecord, GetJobError>> for GetJobQuery {}

#[tracing::instrument(skip(ctx), fields(index = %ctx.index))]
pub async fn handle(ctx: &JobsContext, query: GetJobQuery) -> Result<JobRecord, GetJobError> {
    let source = ctx
        .store
        .get_document(&ctx.index, &query.job_id)
        .await?
        .ok_or_else(|| GetJobError::NotFound(query.job_id.clone()))?;

    let document: JobDocument = serde_json::from_value(source)?;
    Ok(JobRecord::from_document(query.job_id, document))
}
