//! Feature modules implementing the Spark job API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes. Commands and queries are plain data marked as `mediator`
//! requests; a free `handle` function next to each carries the logic.
//!
//! # Features
//!
//! - **jobs**: job submission and status lookup

pub mod jobs;

use axum::Router;

pub use jobs::JobsContext;

/// Creates the versioned API router with all feature routes mounted
pub fn router(ctx: JobsContext) -> Router<()> {
    Router::new().merge(jobs::jobs_routes()).with_state(ctx)
}
