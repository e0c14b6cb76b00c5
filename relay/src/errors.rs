use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Errors that can occur while relaying a request
///
/// The `Display` form carries full detail and is only ever logged. Callers
/// see [`RelayError::public_message`], which never includes upstream detail.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Authorization header is required")]
    MissingCredential,

    #[error("Invalid API key")]
    InvalidCredential,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("ref_no is required")]
    MissingRefNo,

    #[error("Upstream request failed: {0}")]
    UpstreamRequestFailed(String),

    #[error("Upstream timeout after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(StatusCode),

    #[error("Failed to read response body: {0}")]
    ResponseBodyError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingCredential | RelayError::InvalidCredential => {
                StatusCode::UNAUTHORIZED
            }
            RelayError::InvalidBody(_) | RelayError::MissingRefNo => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::MissingCredential => "Authorization header is required",
            RelayError::InvalidCredential => "Invalid API key",
            RelayError::InvalidBody(_) => "invalid request body",
            RelayError::MissingRefNo => "ref_no is required",
            RelayError::UpstreamRequestFailed(_)
            | RelayError::UpstreamTimeout(_)
            | RelayError::UpstreamStatus(_) => "Unknown",
            _ => "Something went wrong",
        }
    }

    /// Short label used to tag upstream error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MissingCredential | RelayError::InvalidCredential => "auth",
            RelayError::InvalidBody(_) | RelayError::MissingRefNo => "validation",
            RelayError::UpstreamRequestFailed(_) | RelayError::HttpClientError(_) => "request",
            RelayError::UpstreamTimeout(_) => "timeout",
            RelayError::UpstreamStatus(_) => "status",
            RelayError::ResponseBodyError(_) => "body",
            RelayError::Serialization(_) | RelayError::Io(_) => "internal",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // Auth failures answer with `message`, everything else with `error`
        let body = match self.status() {
            StatusCode::UNAUTHORIZED => json!({ "message": self.public_message() }),
            _ => json!({ "error": self.public_message() }),
        };

        (self.status(), Json(body)).into_response()
    }
}
