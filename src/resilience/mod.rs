//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection acquisition:
//!     → retries.rs (bounded attempt loop policy)
//!     → backoff.rs (linear delay after each failed attempt)
//!     → db::pool (connect deadline per attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every connect has a deadline
//! - Store connectivity failures are retried inside the pool and only
//!   surfaced once attempts are exhausted

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
