//! JSON error responses for the HTTP adapter.

use crate::error::{Error, ResolutionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::io;

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::bad_request(msg),
            Error::NotFound(id) => ApiError::not_found(format!("Job '{}' not found", id)),
            e @ Error::NotRetryable { .. } => ApiError::bad_request(e.to_string()),
            Error::Resolution(ResolutionError::InvalidUrl) => {
                ApiError::bad_request(format!("Invalid YouTube URL: {}", ResolutionError::InvalidUrl))
            }
            Error::Resolution(e) => {
                tracing::warn!("resolution failed: {}", e);
                ApiError::bad_gateway(format!("Failed to get download URL: {}", e))
            }
            Error::Persistence(e) => {
                tracing::error!("database error: {}", e);
                ApiError::internal("Database error occurred")
            }
            Error::Io(e) if e.kind() == io::ErrorKind::NotFound => {
                ApiError::not_found("File not found")
            }
            Error::Io(e) => {
                tracing::error!("IO error: {}", e);
                ApiError::internal("Error accessing file")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
