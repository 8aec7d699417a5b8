//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{ApiConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then `.env` and process
/// environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<ApiConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ApiConfig::default(),
    };

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to read .env file");
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so tests can feed fixed values.
pub fn apply_env_overrides<F>(config: &mut ApiConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = Some(url);
    }
    if let Some(secret) = lookup("JWT_SECRET_KEY") {
        config.auth.jwt_secret = secret;
    }
    if let Some(alg) = lookup("JWT_ALGORITHM") {
        config.auth.jwt_algorithm = alg;
    }
    if let Some(ttl) = lookup("JWT_ACCESS_TOKEN_EXPIRES") {
        config.auth.token_ttl_secs = ttl.trim().parse().map_err(|_| ConfigError::Env {
            key: "JWT_ACCESS_TOKEN_EXPIRES",
            value: ttl.clone(),
        })?;
    }
    if let Some(origins) = lookup("CORS_ORIGINS") {
        config.cors.origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(env) = lookup("APP_ENV") {
        config.environment = env;
    }
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            key: "PORT",
            value: port.clone(),
        })?;
        let host = config
            .server
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.server.bind_address = format!("{}:{}", host, port);
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::Env {
                    key: "LOG_FORMAT",
                    value: format,
                })
            }
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ApiConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("DATABASE_URL", "postgres://u:p@h:5432/d"),
                ("JWT_ACCESS_TOKEN_EXPIRES", "600"),
                ("CORS_ORIGINS", "http://a.test, https://*.vercel.app,"),
                ("PORT", "8080"),
                ("LOG_FORMAT", "JSON"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.url.as_deref(), Some("postgres://u:p@h:5432/d"));
        assert_eq!(config.auth.token_ttl_secs, 600);
        assert_eq!(config.cors.origins, vec!["http://a.test", "https://*.vercel.app"]);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_ttl_is_reported() {
        let mut config = ApiConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("JWT_ACCESS_TOKEN_EXPIRES", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "JWT_ACCESS_TOKEN_EXPIRES", .. }));
    }
}
