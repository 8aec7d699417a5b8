//! Persistence for users and categories.
//!
//! # Data Flow
//! ```text
//! handler → Pool::acquire → &mut PgConnection
//!     → users.rs / categories.rs (parameterized sqlx queries)
//!     → rows mapped with sqlx::FromRow
//! ```
//!
//! # Design Decisions
//! - Functions borrow a connection; they never acquire or release one
//! - Uniqueness violations are recognised from the driver's SQLSTATE,
//!   not from message text

pub mod categories;
pub mod users;

use thiserror::Error;

pub use categories::{Category, CategoryPatch, NewCategory};
pub use users::{User, UserCredentials};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated ({})", constraint.as_deref().unwrap_or("unknown"))]
    Conflict { constraint: Option<String> },

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                return StoreError::Conflict {
                    constraint: db.constraint().map(String::from),
                };
            }
        }
        StoreError::Database(e)
    }
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
