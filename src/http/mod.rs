//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (panic guard, request ID, trace span, CORS, body limit, timeout)
//!     → middleware/ (per-route metrics)
//!     → auth gate (protected routes only)
//!     → request.rs (JSON object body) → validation.rs
//!     → handlers/ (borrow a pooled connection, run store queries)
//!     → response.rs / error.rs (uniform JSON envelope)
//! ```
//!
//! # Design Decisions
//! - Validation runs before a connection is borrowed
//! - Unknown paths, wrong methods and non-numeric ids share the 404/405 envelope
//! - Internal causes are logged with the request span, never returned

pub mod cors;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod validation;

pub use error::ApiError;
pub use request::{JsonBody, MakeRequestUuid, X_REQUEST_ID};
pub use response::Envelope;
pub use server::{AppState, HttpServer};
