//! API Error Handling
//!
//! Structured error responses with HTTP status codes and request tracking.

use crate::errors::CasinoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code (VALIDATION_ERROR, INSUFFICIENT_FUNDS, ...)
    pub code: String,
    pub message: String,
}

/// A service error bound to the request that produced it
#[derive(Debug)]
pub struct ApiError {
    pub error: CasinoError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(request_id: impl Into<String>, error: CasinoError) -> Self {
        Self {
            error,
            request_id: request_id.into(),
        }
    }

    pub fn bad_request(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(request_id, CasinoError::Validation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.error)
    }
}

/// HTTP status for each error kind
pub fn status_for(error: &CasinoError) -> StatusCode {
    match error {
        CasinoError::Validation(_) => StatusCode::BAD_REQUEST,
        CasinoError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CasinoError::NotFound(_) => StatusCode::NOT_FOUND,
        CasinoError::Integrity(_) => StatusCode::CONFLICT,
        CasinoError::Storage(_) | CasinoError::Migration(_) | CasinoError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.request_id, self.error)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Infrastructure details stay in the logs.
        let message = if self.error.is_domain() {
            self.error.to_string()
        } else {
            error!(request_id = %self.request_id, error = %self.error, "Request failed");
            "Internal server error".to_string()
        };
        if status == StatusCode::CONFLICT {
            warn!(request_id = %self.request_id, error = %self.error, "Request conflicted");
        }

        let mut response = (
            status,
            Json(ErrorResponse {
                request_id: self.request_id.clone(),
                error: ErrorBody {
                    code: self.error.code().to_string(),
                    message,
                },
            }),
        )
            .into_response();

        // Lets the metrics layer count failures by kind.
        response.extensions_mut().insert(ErrorCode(self.error.code()));
        response
    }
}

/// Error code attached to failed responses
#[derive(Debug, Clone, Copy)]
pub struct ErrorCode(pub &'static str);
