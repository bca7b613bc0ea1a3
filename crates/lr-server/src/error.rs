//! Mapping of failures to HTTP responses

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

/// Errors surfaced by the HTTP handlers as `{"detail": ...}` bodies
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be read as the expected JSON
    InvalidBody(String),
    /// The question was empty or only whitespace
    EmptyQuestion,
    /// Anything the RAG system failed at
    Rag(lr_core::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::EmptyQuestion => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rag(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::InvalidBody(reason) => reason.clone(),
            ApiError::EmptyQuestion => "question must not be empty".to_string(),
            ApiError::Rag(e) => e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<lr_core::Error> for ApiError {
    fn from(err: lr_core::Error) -> Self {
        ApiError::Rag(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();
        if status.is_server_error() {
            error!(%status, %detail, "Request failed");
        } else {
            warn!(%status, %detail, "Rejected request");
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
