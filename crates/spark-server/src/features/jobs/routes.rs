//! Job routes
//!
//! Submitting answers `202 Accepted`: the job is recorded, not run.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::commands::{submit::handle as handle_submit, SubmitJobCommand};
use super::queries::{get_job::handle as handle_get_job, GetJobQuery};
use super::JobsContext;
use crate::error::AppError;

/// Versioned job routes, mounted under `/api/v1`
pub fn jobs_routes() -> Router<JobsContext> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:job_id", get(get_job))
}

/// Unversioned submission endpoint kept for existing clients
pub fn submit_routes() -> Router<JobsContext> {
    Router::new().route("/submit", post(submit_job))
}

/// Record a new pending job
///
/// POST /submit
/// POST /api/v1/jobs
async fn submit_job(State(ctx): State<JobsContext>) -> Result<Response, AppError> {
    let record = handle_submit(&ctx, SubmitJobCommand::default()).await?;
    Ok((StatusCode::ACCEPTED, Json(record)).into_response())
}

/// Get a specific job by ID
///
/// GET /api/v1/jobs/:job_id
async fn get_job(
    State(ctx): State<JobsContext>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError> {
    let record = handle_get_job(&ctx, GetJobQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(record)).into_response())
}
