//! Route handlers.
//!
//! Handlers validate input first, then borrow one connection, run their
//! queries, and return the lease explicitly before shaping the response.
//! Early returns after acquisition still release through `Lease`'s drop.

pub mod auth;
pub mod categories;
pub mod diagnostic;
pub mod health;

use crate::http::error::ApiError;

pub const ENDPOINT_NOT_FOUND: &str = "Endpoint not found";

/// Router fallback for unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::not_found(ENDPOINT_NOT_FOUND)
}

/// Router fallback for known paths hit with the wrong verb.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
