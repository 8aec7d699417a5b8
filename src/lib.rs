//! Categories REST API library.
//!
//! CRUD for categories plus registration, login and bearer-token auth,
//! served by axum over a retrying PostgreSQL connection pool.

pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod store;

pub use config::schema::ApiConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
