//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level so operators can turn on
//! per-module debugging without touching the config file.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::LogFormat;
use crate::config::ObservabilityConfig;

/// Filter used when `RUST_LOG` is unset. A bare level applies to this
/// crate and the HTTP layer; anything with a `=` is taken verbatim.
pub fn default_directive(level: &str) -> String {
    if level.contains('=') {
        return level.to_string();
    }
    format!("categories_api={level},tower_http={level},sqlx=warn")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_quiets_sqlx() {
        let d = default_directive("debug");
        assert!(d.starts_with("categories_api=debug"));
        assert!(d.contains("sqlx=warn"));
        assert!(EnvFilter::try_new(d).is_ok());
    }

    #[test]
    fn test_full_directive_passes_through() {
        assert_eq!(default_directive("categories_api=trace"), "categories_api=trace");
    }
}
