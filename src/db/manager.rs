//! Connection manager abstraction.
//!
//! The pool owns bookkeeping (bounds, leases, retries); a manager owns the
//! store-specific operations on a single connection. Production uses
//! [`PgManager`](crate::db::postgres::PgManager); tests plug in doubles.

use async_trait::async_trait;
use std::time::Duration;

/// Boxed error carried across the pool boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Store-specific connection lifecycle hooks.
#[async_trait]
pub trait ConnectionManager: Send + Sync + 'static {
    /// A live link to the backing store.
    type Connection: Send + 'static;

    /// Error raised by the driver.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new connection. The pool applies the connect deadline.
    async fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Bound server-side execution time of every statement on `conn`.
    async fn set_statement_timeout(
        &self,
        conn: &mut Self::Connection,
        timeout: Duration,
    ) -> Result<(), Self::Error>;

    /// Abort any transaction left open on `conn`.
    async fn rollback(&self, conn: &mut Self::Connection) -> Result<(), Self::Error>;

    /// Run a trivial round trip.
    async fn ping(&self, conn: &mut Self::Connection) -> Result<(), Self::Error>;

    /// Cheap synchronous check run before a connection goes back to idle.
    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }

    /// Tear the connection down.
    async fn close(&self, conn: Self::Connection);
}
