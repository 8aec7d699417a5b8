//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → .env + process environment overrides
//!     → validation.rs (semantic checks)
//!     → ApiConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ApiConfig;
pub use schema::AuthConfig;
pub use schema::CorsConfig;
pub use schema::DatabaseConfig;
pub use schema::ObservabilityConfig;
pub use schema::ServerConfig;
