//! PostgreSQL connection manager built on sqlx.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::db::manager::ConnectionManager;
use crate::db::pool::Pool;

/// Pool of PostgreSQL connections used by the request handlers.
pub type PgPool = Pool<PgManager>;

/// Opens and maintains `PgConnection`s for the pool.
#[derive(Debug, Clone)]
pub struct PgManager {
    options: PgConnectOptions,
    url: String,
}

impl PgManager {
    /// Parse a `postgres://` connection string. Does not connect.
    pub fn from_url(url: &str) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(url)?;
        Ok(Self {
            options,
            url: url.to_string(),
        })
    }

    /// Connection string with the password replaced, safe to log.
    pub fn masked_url(&self) -> String {
        mask_database_url(&self.url)
    }

    /// Host and port the manager connects to.
    pub fn endpoint(&self) -> (String, u16) {
        (self.options.get_host().to_string(), self.options.get_port())
    }
}

#[async_trait]
impl ConnectionManager for PgManager {
    type Connection = PgConnection;
    type Error = sqlx::Error;

    async fn connect(&self) -> Result<PgConnection, sqlx::Error> {
        self.options.connect().await
    }

    async fn set_statement_timeout(
        &self,
        conn: &mut PgConnection,
        timeout: Duration,
    ) -> Result<(), sqlx::Error> {
        // SET does not accept bind parameters; the value is an integer we own.
        let sql = format!("SET statement_timeout = {}", timeout.as_millis());
        sqlx::query(&sql).execute(&mut *conn).await?;
        Ok(())
    }

    async fn rollback(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        Ok(())
    }

    async fn ping(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }

    async fn close(&self, conn: PgConnection) {
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Error while closing database connection");
        }
    }
}

/// Replace the password component of a connection URL with `***`.
pub fn mask_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}
