//! Connection pool behaviour against an in-memory connection manager.

use std::sync::atomic::Ordering;
use std::time::Duration;

use categories_api::db::{Lease, LeaseKind, Pool, PoolError};
use categories_api::resilience::RetryPolicy;

mod common;
use common::{eventually, pool_config, MockManager};

#[tokio::test]
async fn test_initialize_opens_min_connections() {
    let manager = MockManager::new();
    let pool = Pool::initialize(manager.clone(), pool_config(2, 5)).await;

    let status = pool.status();
    assert_eq!(status.live, 2);
    assert_eq!(status.idle, 2);
    assert_eq!(status.borrowed, 0);
    assert!(!status.degraded);
    assert_eq!(manager.connects(), 2);
}

#[tokio::test]
async fn test_unreachable_store_degrades_instead_of_failing() {
    let manager = MockManager::unreachable();
    let pool = Pool::initialize(manager.clone(), pool_config(1, 5)).await;
    assert!(pool.is_degraded());
    assert_eq!(pool.status().live, 0);

    // Store comes back: acquisitions bypass the pool.
    manager.set_reachable(true);
    let lease = pool.acquire(RetryPolicy::once()).await.unwrap();
    assert_eq!(lease.kind(), LeaseKind::Direct);
    assert_eq!(pool.status().direct, 1);

    pool.release(lease).await;
    let status = pool.status();
    assert_eq!(status.direct, 0);
    assert_eq!(status.live, 0);
    assert_eq!(manager.closes(), 1);
}

#[tokio::test]
async fn test_exhausted_pool_without_fallback_fails_attempt() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 2));

    let a = pool.acquire(RetryPolicy::once()).await.unwrap();
    let b = pool.acquire(RetryPolicy::once()).await.unwrap();
    let err = pool.acquire(RetryPolicy::once()).await.unwrap_err();
    assert!(matches!(err, PoolError::ConnectionUnavailable { attempts: 1, .. }));
    assert!(err.to_string().contains("pool exhausted"));

    let status = pool.status();
    assert_eq!(status.live, 2);
    assert_eq!(status.borrowed, 2);

    pool.release(a).await;
    pool.release(b).await;
    assert_eq!(pool.status().idle, 2);
}

#[tokio::test]
async fn test_exhausted_pool_falls_back_to_direct() {
    let manager = MockManager::new();
    let mut config = pool_config(0, 1);
    config.direct_fallback = true;
    let pool = Pool::new(manager.clone(), config);

    let pooled = pool.acquire(RetryPolicy::once()).await.unwrap();
    let direct = pool.acquire(RetryPolicy::once()).await.unwrap();
    assert_eq!(pooled.kind(), LeaseKind::Pooled);
    assert!(direct.is_direct());
    assert_eq!(pool.status().live, 1);

    pool.release(direct).await;
    pool.release(pooled).await;
    let status = pool.status();
    assert_eq!(status.idle, 1);
    assert_eq!(status.direct, 0);
    assert_eq!(manager.closes(), 1);
}

#[tokio::test]
async fn test_bound_holds_under_concurrency() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 3));

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let lease = pool
                .acquire(RetryPolicy::new(200, Duration::from_millis(1)))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            pool.release(lease).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(manager.max_open() <= 3, "opened {} at once", manager.max_open());
    let status = pool.status();
    assert!(status.live <= 3);
    assert_eq!(status.borrowed, 0);
}

#[tokio::test]
async fn test_release_rolls_back_uncommitted_work() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 1));

    let mut lease = pool.acquire(RetryPolicy::once()).await.unwrap();
    let id = lease.id;
    lease.uncommitted.push("INSERT INTO categories ...".into());
    pool.release(lease).await;
    assert_eq!(manager.rollbacks(), 1);

    let lease = pool.acquire(RetryPolicy::once()).await.unwrap();
    assert_eq!(lease.id, id, "idle connection is reused");
    assert!(lease.uncommitted.is_empty());
    pool.release(lease).await;
}

#[tokio::test]
async fn test_statement_timeout_applied_on_every_lease() {
    let pool = Pool::new(MockManager::new(), pool_config(0, 1));

    let lease = pool.acquire(RetryPolicy::once()).await.unwrap();
    assert_eq!(lease.statement_timeout, Some(Duration::from_secs(30)));
    pool.release(lease).await;
}

#[tokio::test]
async fn test_release_none_is_a_noop() {
    let pool = Pool::initialize(MockManager::new(), pool_config(1, 2)).await;
    let before = pool.status();
    pool.release(None::<Lease<MockManager>>).await;
    assert_eq!(pool.status(), before);
}

#[tokio::test]
async fn test_foreign_lease_goes_back_to_its_origin() {
    let origin = Pool::new(MockManager::new(), pool_config(0, 2));
    let other = Pool::initialize(MockManager::new(), pool_config(1, 2)).await;
    let other_before = other.status();

    let lease = origin.acquire(RetryPolicy::once()).await.unwrap();
    other.release(lease).await;

    let status = origin.status();
    assert_eq!(status.borrowed, 0);
    assert_eq!(status.idle, 1);
    assert_eq!(other.status(), other_before);
}

#[tokio::test]
async fn test_dropped_lease_is_reclaimed() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 1));

    {
        let mut lease = pool.acquire(RetryPolicy::once()).await.unwrap();
        lease.uncommitted.push("UPDATE ...".into());
        // Early exit without release.
    }

    assert!(eventually(|| pool.status().idle == 1).await);
    assert_eq!(pool.status().borrowed, 0);
    assert_eq!(manager.rollbacks(), 1);
}

#[tokio::test]
async fn test_broken_connection_is_closed_not_pooled() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 2));

    let mut lease = pool.acquire(RetryPolicy::once()).await.unwrap();
    lease.broken = true;
    pool.release(lease).await;

    let status = pool.status();
    assert_eq!(status.live, 0);
    assert_eq!(status.idle, 0);
    assert_eq!(manager.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_waits_linear_backoff() {
    let manager = MockManager::unreachable();
    let pool = Pool::new(manager.clone(), pool_config(0, 2));

    let start = tokio::time::Instant::now();
    let err = pool
        .acquire(RetryPolicy::new(3, Duration::from_secs(2)))
        .await
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_secs(12));
    match err {
        PoolError::ConnectionUnavailable { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(source.to_string().contains("connection refused"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(manager.connects(), 3);
    assert_eq!(pool.status().live, 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_succeeds_after_transient_failures() {
    let manager = MockManager::new();
    manager.state.fail_next.store(2, Ordering::SeqCst);
    let pool = Pool::new(manager.clone(), pool_config(0, 2));

    let start = tokio::time::Instant::now();
    let lease = pool
        .acquire(RetryPolicy::new(3, Duration::from_secs(2)))
        .await
        .unwrap();

    // 2s after the first failure, 4s after the second.
    assert!(start.elapsed() >= Duration::from_secs(6));
    assert!(start.elapsed() < Duration::from_secs(12));
    assert_eq!(manager.connects(), 3);
    pool.release(lease).await;
}

#[tokio::test]
async fn test_health_check_always_returns_lease() {
    let manager = MockManager::new();
    let pool = Pool::initialize(manager.clone(), pool_config(1, 2)).await;

    let report = pool.health_check().await;
    assert!(report.connected);
    assert_eq!(pool.status().borrowed, 0);

    manager.state.fail_ping.store(true, Ordering::SeqCst);
    let report = pool.health_check().await;
    assert!(!report.connected);

    // The connection that failed its ping is not pooled again.
    let status = pool.status();
    assert_eq!(status.borrowed, 0);
    assert_eq!(status.idle, 0);
    assert_eq!(status.live, 0);
    assert_eq!(manager.closes(), 1);
}

#[tokio::test]
async fn test_failed_rollback_on_release_closes_connection() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 1));

    let first = pool.acquire(RetryPolicy::once()).await.unwrap();
    let dead_id = first.id;
    manager.state.fail_rollback.store(true, Ordering::SeqCst);
    pool.release(first).await;

    let status = pool.status();
    assert_eq!(manager.rollbacks(), 1);
    assert_eq!(manager.closes(), 1);
    assert_eq!(status.live, 0);
    assert_eq!(status.idle, 0);
    assert_eq!(status.borrowed, 0);

    // The slot is free again, so a fresh connection replaces the dead one.
    manager.state.fail_rollback.store(false, Ordering::SeqCst);
    let next = pool.acquire(RetryPolicy::once()).await.unwrap();
    assert_ne!(next.id, dead_id);
    assert_eq!(manager.connects(), 2);
    pool.release(next).await;
    assert_eq!(pool.status().idle, 1);
}

#[tokio::test]
async fn test_failed_rollback_on_drop_closes_connection() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 1));
    manager.state.fail_rollback.store(true, Ordering::SeqCst);

    {
        let _lease = pool.acquire(RetryPolicy::once()).await.unwrap();
    }

    assert!(eventually(|| manager.closes() == 1).await);
    let status = pool.status();
    assert_eq!(status.live, 0);
    assert_eq!(status.idle, 0);
    assert_eq!(status.borrowed, 0);
}

#[tokio::test]
async fn test_marked_broken_lease_is_not_pooled() {
    let manager = MockManager::new();
    let pool = Pool::new(manager.clone(), pool_config(0, 1));

    let mut lease = pool.acquire(RetryPolicy::once()).await.unwrap();
    lease.mark_broken();
    pool.release(lease).await;

    assert_eq!(manager.rollbacks(), 1);
    assert_eq!(manager.closes(), 1);
    assert_eq!(pool.status().live, 0);
}

#[tokio::test]
async fn test_health_check_reports_unreachable_store() {
    let pool = Pool::initialize(MockManager::unreachable(), pool_config(1, 2)).await;
    let report = pool.health_check().await;
    assert!(!report.connected);
    assert!(report.detail.contains("connection refused"));
}

#[tokio::test]
async fn test_close_refuses_new_leases_and_closes_returns() {
    let manager = MockManager::new();
    let pool = Pool::initialize(manager.clone(), pool_config(2, 3)).await;

    let outstanding = pool.acquire(RetryPolicy::once()).await.unwrap();
    pool.close().await;
    assert_eq!(manager.closes(), 1);
    assert!(matches!(
        pool.acquire(RetryPolicy::once()).await,
        Err(PoolError::Closed)
    ));

    pool.release(outstanding).await;
    assert_eq!(manager.closes(), 2);
    assert_eq!(pool.status().live, 0);
}
