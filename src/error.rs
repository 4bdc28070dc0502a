//! HelpDesk error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// HelpDesk error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The lexical index was asked to fit zero documents
    #[error("Cannot build an index over an empty corpus")]
    EmptyCorpus,

    /// Empty or whitespace-only query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Knowledge base loading error
    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    /// Generative endpoint error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Authentication error
    #[error("Auth error: {0}")]
    Auth(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for HelpDesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn with_code(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_code("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_code("FORBIDDEN", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_code("CONFLICT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code("INTERNAL_ERROR", message)
    }

    /// HTTP status matching the error code
    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "BAD_REQUEST" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidQuery(msg) => ApiError::bad_request(msg),
            Error::Auth(msg) => ApiError::unauthorized(msg),
            other => {
                tracing::error!("Request failed: {}", other);
                ApiError::internal(other.to_string())
            }
        }
    }
}
