//! Connection leases.
//!
//! # Responsibilities
//! - Grant exclusive use of one connection to one caller
//! - Remember whether the connection is pooled or direct
//! - Hand the connection back on every exit path

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::db::manager::ConnectionManager;
use crate::db::pool::PoolInner;

/// Where a leased connection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseKind {
    /// Counted against the pool bound; goes back to idle on release.
    Pooled,
    /// Opened outside the pool; closed on release.
    Direct,
}

impl LeaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseKind::Pooled => "pooled",
            LeaseKind::Direct => "direct",
        }
    }
}

/// A RAII lease on a connection.
///
/// Dereferences to the underlying connection. Prefer
/// [`Pool::release`](crate::db::Pool::release); a lease that is simply
/// dropped schedules the same rollback-and-return on the current runtime.
pub struct Lease<M: ConnectionManager> {
    conn: Option<M::Connection>,
    kind: LeaseKind,
    broken: bool,
    pub(crate) pool: Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> Lease<M> {
    pub(crate) fn new(conn: M::Connection, kind: LeaseKind, pool: Arc<PoolInner<M>>) -> Self {
        Self {
            conn: Some(conn),
            kind,
            broken: false,
            pool,
        }
    }

    pub fn kind(&self) -> LeaseKind {
        self.kind
    }

    pub fn is_direct(&self) -> bool {
        self.kind == LeaseKind::Direct
    }

    /// Force-close the connection on release instead of pooling it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Roll back and return the connection to the pool that issued it.
    pub async fn release(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.clone().reclaim(conn, self.kind, self.broken).await;
        }
    }
}

impl<M: ConnectionManager> Deref for Lease<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("lease used after release")
    }
}

impl<M: ConnectionManager> DerefMut for Lease<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("lease used after release")
    }
}

impl<M: ConnectionManager> Drop for Lease<M> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let pool = self.pool.clone();
        let kind = self.kind;
        let broken = self.broken;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    pool.reclaim(conn, kind, broken).await;
                });
            }
            Err(_) => {
                tracing::warn!(kind = kind.as_str(), "Lease dropped outside a runtime; discarding connection");
                pool.forget(kind);
                drop(conn);
            }
        }
    }
}

impl<M: ConnectionManager> std::fmt::Debug for Lease<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("kind", &self.kind)
            .field("broken", &self.broken)
            .field("released", &self.conn.is_none())
            .finish()
    }
}
