//! Database access subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Pool::initialize → open min_size connections
//!     → unreachable store? mark degraded, keep running
//!
//! Per request:
//!     handler → Pool::acquire(RetryPolicy)
//!         → idle connection | new pooled connection | direct connection
//!         → SET statement_timeout
//!     handler runs queries on the Lease
//!     handler → Pool::release(lease)
//!         → ROLLBACK → back to idle (or force-close)
//! ```
//!
//! # Design Decisions
//! - The pool is an owned handle injected into handlers, never a global
//! - Store-specific work sits behind `ConnectionManager` so tests can use doubles
//! - Availability beats strict bounding: exhaustion falls back to direct connections

pub mod lease;
pub mod manager;
pub mod pool;
pub mod postgres;

pub use lease::{Lease, LeaseKind};
pub use manager::{BoxError, ConnectionManager};
pub use pool::{AttemptError, HealthReport, Pool, PoolConfig, PoolError, PoolStatus};
pub use postgres::{PgManager, PgPool};
