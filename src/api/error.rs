//! Mapping of pipeline, storage and export failures onto HTTP responses.

use crate::analysis::PipelineError;
use crate::export::ExportError;
use crate::storage::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Analysis not found")]
    NotFound,

    #[error("Not found")]
    UnknownRoute,

    #[error("Error retrieving analysis: {0}")]
    Storage(#[from] StoreError),

    #[error("Error generating export: {0}")]
    Export(#[from] ExportError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyBatch { .. } => ApiError::BadRequest(err.to_string()),
            PipelineError::Storage(e) => ApiError::Storage(e),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound | ApiError::UnknownRoute => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Export(_) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
