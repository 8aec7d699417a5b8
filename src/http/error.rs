//! HTTP-facing error taxonomy.
//!
//! Every failure leaves the service as `{"success": false, "error": "..."}`.
//! Internal causes are logged, never echoed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::auth::token::TokenError;
use crate::db::PoolError;
use crate::store::StoreError;

pub const STORE_UNAVAILABLE: &str =
    "Database temporarily unavailable. Please try again in a moment.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// User-fixable input problem.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body too large")]
    PayloadTooLarge,

    /// Uniqueness violation; reported as 400.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(cause: impl std::fmt::Display) -> Self {
        Self::Internal(cause.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    pub fn public_message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::ServiceUnavailable(m) => m,
            ApiError::MethodNotAllowed => "Method not allowed",
            ApiError::PayloadTooLarge => "Request body too large",
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            tracing::error!(error = %cause, "Request failed with internal error");
        }
        let body = json!({
            "success": false,
            "error": self.public_message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<PoolError> for ApiError {
    fn from(e: PoolError) -> Self {
        tracing::error!(error = %e, "Database unavailable");
        ApiError::ServiceUnavailable(STORE_UNAVAILABLE.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Missing => ApiError::unauthorized("Authentication token is missing"),
            TokenError::Malformed => ApiError::unauthorized("Invalid token"),
            TokenError::Expired => ApiError::unauthorized("Token has expired"),
            other => ApiError::internal(other),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::InvalidInput => ApiError::validation("Password is required"),
            other => ApiError::internal(other),
        }
    }
}

/// Store errors without a more specific mapping at the call site.
impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { constraint } => ApiError::Conflict(format!(
                "Database integrity error: duplicate value violates {}",
                constraint.as_deref().unwrap_or("a unique constraint")
            )),
            StoreError::Database(e) => ApiError::internal(e),
        }
    }
}
