//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → connection pool → token codec → metrics → bind listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → stop accepting → drain in-flight requests → close pool
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - A database outage at boot degrades the pool instead of aborting
//! - Ordered shutdown: stop accept, drain, close connections

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, StartupError};
