//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that required settings are present
//! - Validate value ranges (timeouts > 0, pool bounds ordered)
//! - Refuse development secrets in production
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ApiConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::auth::token::parse_algorithm;
use crate::config::schema::{ApiConfig, DEV_JWT_SECRET};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("JWT secret must be changed in production environment")]
    DevSecretInProduction,

    #[error("unsupported JWT algorithm '{0}' (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),

    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.database.url.as_deref() {
        Some(url) if !url.trim().is_empty() => {}
        _ => errors.push(ValidationError::Missing("DATABASE_URL")),
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::Missing("JWT_SECRET_KEY"));
    } else if config.is_production() && config.auth.jwt_secret == DEV_JWT_SECRET {
        errors.push(ValidationError::DevSecretInProduction);
    }

    if parse_algorithm(&config.auth.jwt_algorithm).is_none() {
        errors.push(ValidationError::UnsupportedAlgorithm(
            config.auth.jwt_algorithm.clone(),
        ));
    }

    if config.auth.token_ttl_secs <= 0 {
        errors.push(ValidationError::OutOfRange {
            field: "auth.token_ttl_secs",
            reason: "must be positive".to_string(),
        });
    }

    let db = &config.database;
    if db.max_connections == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "database.max_connections",
            reason: "must be at least 1".to_string(),
        });
    }
    if db.min_connections > db.max_connections {
        errors.push(ValidationError::OutOfRange {
            field: "database.min_connections",
            reason: format!(
                "{} exceeds max_connections {}",
                db.min_connections, db.max_connections
            ),
        });
    }
    if db.connect_timeout_secs == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "database.connect_timeout_secs",
            reason: "must be positive".to_string(),
        });
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "server.request_timeout_secs",
            reason: "must be positive".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.database.url = Some("postgres://localhost/fncs".into());
        config
    }

    #[test]
    fn test_default_with_url_is_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ApiConfig::default();
        config.auth.jwt_algorithm = "RS256".into();
        config.database.min_connections = 5;
        config.database.max_connections = 2;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Missing("DATABASE_URL")));
        assert!(errors.contains(&ValidationError::UnsupportedAlgorithm("RS256".into())));
    }

    #[test]
    fn test_dev_secret_rejected_in_production() {
        let mut config = valid();
        config.environment = "production".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DevSecretInProduction]);

        config.auth.jwt_secret = "a-real-secret".into();
        assert!(validate_config(&config).is_ok());
    }
}
