//! Bounded connection pool with retrying acquisition.
//!
//! # Responsibilities
//! - Keep at most `max_size` pooled connections alive
//! - Lease connections exclusively, retrying with linear backoff
//! - Fall back to direct connections when degraded or exhausted
//! - Roll back every connection before it is reused
//!
//! # State Transitions
//! ```text
//! idle ──acquire──▶ borrowed ──release──▶ idle
//!                       │
//!                       └──release (closed/broken/overflow)──▶ destroyed
//! ```
//!
//! All counters live behind one mutex which is never held across an await.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::db::lease::{Lease, LeaseKind};
use crate::db::manager::{BoxError, ConnectionManager};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Pool sizing and per-connection deadlines.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_size: usize,
    pub max_size: usize,
    pub connect_timeout: Duration,
    /// Zero disables the per-lease statement timeout.
    pub statement_timeout: Duration,
    pub direct_fallback: bool,
    pub health_check_retries: u32,
}

impl PoolConfig {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            min_size: config.min_connections,
            max_size: config.max_connections,
            connect_timeout: config.connect_timeout(),
            statement_timeout: config.statement_timeout(),
            direct_fallback: config.direct_fallback,
            health_check_retries: config.health_check_retries,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

/// Errors surfaced to pool callers.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every attempt failed; carries the last underlying cause.
    #[error("database connection unavailable after {attempts} attempt(s): {source}")]
    ConnectionUnavailable {
        attempts: u32,
        #[source]
        source: BoxError,
    },

    #[error("connection pool is closed")]
    Closed,
}

/// Why a single acquisition attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("connect failed: {0}")]
    Connect(#[source] BoxError),

    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("pool exhausted ({0} connections in use)")]
    Exhausted(usize),

    #[error("pool closed")]
    Closed,
}

/// Outcome of a liveness probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub connected: bool,
    pub detail: String,
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub min_size: usize,
    pub max_size: usize,
    pub live: usize,
    pub idle: usize,
    pub borrowed: usize,
    pub direct: usize,
    pub degraded: bool,
    pub closed: bool,
}

struct PoolState<C> {
    idle: VecDeque<C>,
    /// Pooled connections in existence (idle + borrowed + being opened).
    live: usize,
    borrowed: usize,
    closed: bool,
}

pub(crate) struct PoolInner<M: ConnectionManager> {
    manager: M,
    config: PoolConfig,
    state: Mutex<PoolState<M::Connection>>,
    degraded: AtomicBool,
    direct: AtomicUsize,
}

/// Shared handle to a connection pool. Cloning is cheap.
pub struct Pool<M: ConnectionManager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: ConnectionManager> std::fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("status", &self.status()).finish()
    }
}

impl<M: ConnectionManager> Pool<M> {
    /// Create an empty pool without touching the store.
    pub fn new(manager: M, config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                manager,
                config,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    live: 0,
                    borrowed: 0,
                    closed: false,
                }),
                degraded: AtomicBool::new(false),
                direct: AtomicUsize::new(0),
            }),
        }
    }

    /// Create the pool and open `min_size` connections (at least one, as a
    /// reachability probe).
    ///
    /// An unreachable store does not fail startup: the pool is marked
    /// degraded and every later acquisition goes straight to a direct
    /// connection.
    pub async fn initialize(manager: M, config: PoolConfig) -> Self {
        let pool = Self::new(manager, config);
        let target = pool.inner.config.min_size.max(1).min(pool.inner.config.max_size);

        for _ in 0..target {
            if !pool.inner.reserve_slot() {
                break;
            }
            match pool.inner.open().await {
                Ok(conn) => {
                    let mut state = pool.inner.state.lock();
                    state.idle.push_back(conn);
                }
                Err(e) => {
                    pool.inner.forget_slot(false);
                    pool.inner.degraded.store(true, Ordering::Relaxed);
                    tracing::warn!(error = %e, "Database unreachable at startup; pool running in degraded mode");
                    break;
                }
            }
        }

        let status = pool.status();
        metrics::set_pool_gauges(&status);
        tracing::info!(
            min_size = status.min_size,
            max_size = status.max_size,
            live = status.live,
            degraded = status.degraded,
            "Connection pool initialized"
        );
        pool
    }

    /// Obtain a connection, retrying with linear backoff.
    ///
    /// Potentially slow: up to `policy.total_delay()` of sleeping plus one
    /// connect deadline per attempt. Dropping the future cancels it.
    pub async fn acquire(&self, policy: RetryPolicy) -> Result<Lease<M>, PoolError> {
        let mut last_error: Option<AttemptError> = None;
        let mut attempts = 0;

        for attempt in policy.attempts() {
            attempts = attempt;
            match self.try_acquire().await {
                Ok(mut lease) => {
                    self.prepare(&mut lease).await;
                    metrics::record_pool_acquire(lease.kind().as_str());
                    metrics::set_pool_gauges(&self.status());
                    if attempt > 1 {
                        tracing::info!(attempt, kind = lease.kind().as_str(), "Database connection acquired after retry");
                    }
                    return Ok(lease);
                }
                Err(AttemptError::Closed) => return Err(PoolError::Closed),
                Err(e) => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_retries.max(1),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Database connection attempt failed"
                    );
                    metrics::record_pool_retry();
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        metrics::record_pool_acquire("failed");
        let source: BoxError = match last_error {
            Some(e) => Box::new(e),
            None => "no acquisition attempt was made".into(),
        };
        tracing::error!(attempts, error = %source, "Giving up on database connection");
        Err(PoolError::ConnectionUnavailable { attempts, source })
    }

    /// Return a lease. Accepts `None` as a no-op.
    ///
    /// A lease issued by another pool is handed back to that pool; this
    /// pool's counters are not touched.
    pub async fn release<L>(&self, lease: L)
    where
        L: Into<Option<Lease<M>>>,
    {
        let Some(lease) = lease.into() else {
            return;
        };
        if !Arc::ptr_eq(&lease.pool, &self.inner) {
            tracing::warn!("Lease released to a pool that did not issue it; returning it to its origin");
        }
        lease.release().await;
    }

    /// Borrow a connection, run `SELECT 1`, and give it back.
    pub async fn health_check(&self) -> HealthReport {
        let policy = RetryPolicy::new(self.inner.config.health_check_retries, Duration::ZERO);
        let mut lease = match self.acquire(policy).await {
            Ok(lease) => lease,
            Err(e) => {
                return HealthReport {
                    connected: false,
                    detail: e.to_string(),
                }
            }
        };

        let result = self.inner.manager.ping(&mut *lease).await;
        let via = lease.kind().as_str();
        if result.is_err() {
            lease.mark_broken();
        }
        self.release(lease).await;

        match result {
            Ok(()) => HealthReport {
                connected: true,
                detail: format!("probe query succeeded ({} connection)", via),
            },
            Err(e) => HealthReport {
                connected: false,
                detail: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock();
        PoolStatus {
            min_size: self.inner.config.min_size,
            max_size: self.inner.config.max_size,
            live: state.live,
            idle: state.idle.len(),
            borrowed: state.borrowed,
            direct: self.inner.direct.load(Ordering::Relaxed),
            degraded: self.is_degraded(),
            closed: state.closed,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::Relaxed)
    }

    pub fn manager(&self) -> &M {
        &self.inner.manager
    }

    /// Close idle connections and refuse further acquisitions.
    ///
    /// Connections still on lease are closed as they come back.
    pub async fn close(&self) {
        let drained: Vec<M::Connection> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.live -= drained.len();
            drained
        };

        let count = drained.len();
        for conn in drained {
            self.inner.manager.close(conn).await;
        }
        metrics::set_pool_gauges(&self.status());
        tracing::info!(closed = count, "Connection pool closed");
    }

    async fn try_acquire(&self) -> Result<Lease<M>, AttemptError> {
        let reserved = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(AttemptError::Closed);
            }
            if let Some(conn) = state.idle.pop_back() {
                state.borrowed += 1;
                return Ok(Lease::new(conn, LeaseKind::Pooled, self.inner.clone()));
            }
            if !self.is_degraded() && state.live < self.inner.config.max_size {
                state.live += 1;
                state.borrowed += 1;
                true
            } else {
                false
            }
        };

        if reserved {
            return match self.inner.open().await {
                Ok(conn) => Ok(Lease::new(conn, LeaseKind::Pooled, self.inner.clone())),
                Err(e) => {
                    self.inner.forget_slot(true);
                    Err(e)
                }
            };
        }

        if self.is_degraded() || self.inner.config.direct_fallback {
            tracing::debug!(degraded = self.is_degraded(), "Opening direct database connection");
            let conn = self.inner.open().await?;
            self.inner.direct.fetch_add(1, Ordering::Relaxed);
            return Ok(Lease::new(conn, LeaseKind::Direct, self.inner.clone()));
        }

        Err(AttemptError::Exhausted(self.inner.config.max_size))
    }

    async fn prepare(&self, lease: &mut Lease<M>) {
        let timeout = self.inner.config.statement_timeout;
        if timeout.is_zero() {
            return;
        }
        if let Err(e) = self.inner.manager.set_statement_timeout(&mut *lease, timeout).await {
            tracing::warn!(error = %e, "Failed to set statement timeout; continuing without it");
        }
    }
}

impl<M: ConnectionManager> PoolInner<M> {
    async fn open(&self) -> Result<M::Connection, AttemptError> {
        match tokio::time::timeout(self.config.connect_timeout, self.manager.connect()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(AttemptError::Connect(Box::new(e))),
            Err(_) => Err(AttemptError::Timeout(self.config.connect_timeout)),
        }
    }

    fn reserve_slot(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.live >= self.config.max_size {
            return false;
        }
        state.live += 1;
        true
    }

    fn forget_slot(&self, borrowed: bool) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
        if borrowed {
            state.borrowed = state.borrowed.saturating_sub(1);
        }
    }

    /// Correct counters for a connection that is gone without a round trip.
    pub(crate) fn forget(&self, kind: LeaseKind) {
        match kind {
            LeaseKind::Pooled => self.forget_slot(true),
            LeaseKind::Direct => {
                self.direct.fetch_sub(1, Ordering::Relaxed);
            }
        }
    }

    /// Roll back, then return to idle or destroy.
    ///
    /// A failed rollback means the link is unusable, so the connection is
    /// treated as broken.
    pub(crate) async fn reclaim(
        self: Arc<Self>,
        mut conn: M::Connection,
        kind: LeaseKind,
        mut broken: bool,
    ) {
        if let Err(e) = self.manager.rollback(&mut conn).await {
            tracing::debug!(error = %e, "Rollback on release failed; discarding connection");
            broken = true;
        }

        match kind {
            LeaseKind::Direct => {
                self.manager.close(conn).await;
                self.direct.fetch_sub(1, Ordering::Relaxed);
            }
            LeaseKind::Pooled => {
                let broken = broken || self.manager.has_broken(&mut conn);
                let rejected = {
                    let mut state = self.state.lock();
                    state.borrowed = state.borrowed.saturating_sub(1);
                    if state.closed || broken || state.idle.len() >= self.config.max_size {
                        state.live = state.live.saturating_sub(1);
                        Some(conn)
                    } else {
                        state.idle.push_back(conn);
                        None
                    }
                };

                if let Some(conn) = rejected {
                    tracing::debug!(broken, "Connection not returned to pool; force-closing");
                    metrics::record_pool_force_closed();
                    self.manager.close(conn).await;
                }
            }
        }

        let state = self.state.lock();
        metrics::set_pool_gauges(&PoolStatus {
            min_size: self.config.min_size,
            max_size: self.config.max_size,
            live: state.live,
            idle: state.idle.len(),
            borrowed: state.borrowed,
            direct: self.direct.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            closed: state.closed,
        });
    }
}
