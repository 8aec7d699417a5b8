//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation picks it up from there)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is attached by the HTTP layer and shows up in every span
//! - Metric updates are cheap; without an installed recorder they are no-ops
//! - Secrets and connection strings are masked before they reach a log line

pub mod logging;
pub mod metrics;
