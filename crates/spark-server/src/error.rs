//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use spark_common::StoreError;
use thiserror::Error;

use crate::features::jobs::commands::SubmitJobError;
use crate::features::jobs::queries::GetJobError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connectivity(msg) => AppError::StoreUnavailable(msg),
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<SubmitJobError> for AppError {
    fn from(err: SubmitJobError) -> Self {
        match err {
            SubmitJobError::Store(e) => e.into(),
            SubmitJobError::Encode(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<GetJobError> for AppError {
    fn from(err: GetJobError) -> Self {
        match err {
            GetJobError::NotFound(id) => AppError::NotFound(format!("Job '{}' not found", id)),
            GetJobError::Store(e) => e.into(),
            GetJobError::Malformed(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::StoreUnavailable(ref message) => {
                tracing::error!("Document store unavailable: {}", message);
                "Document store is unavailable".to_string()
            },
            AppError::Store(ref message) => {
                tracing::error!("Document store error: {}", message);
                "A document store error occurred".to_string()
            },
            AppError::NotFound(ref message) => message.clone(),
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                "Internal server error".to_string()
            },
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
