use lambda_http::{http::StatusCode, Body, Error, Response};
use thiserror::Error;

use crate::respond;

/// Failures reported by a `TaskStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the caller's credentials.
    #[error("store rejected credentials: {0}")]
    Unauthorized(String),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The store could not be reached (connect failure, timeout).
    #[error("store unreachable: {0}")]
    Transport(String),

    /// The store answered, but not with the shape we expect.
    #[error("unexpected store response: {0}")]
    Decode(String),
}

/// Request-level error taxonomy. Every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    /// Absent and not-owned records are deliberately indistinguishable.
    #[error("Task not found")]
    NotFound,

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    UpstreamFailure(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "Unauthenticated",
            ApiError::NotFound => "NotFound",
            ApiError::ValidationFailed(_) => "ValidationFailed",
            ApiError::UpstreamFailure(_) => "UpstreamFailure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Render as `{"error": <kind>, "message": <detail>}`.
    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        respond::json(self.status(), &body)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized(detail) => ApiError::Unauthenticated(format!(
                "Could not validate credentials: {}",
                detail
            )),
            other => ApiError::UpstreamFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ValidationFailed(format!("Invalid request body: {}", err))
    }
}
