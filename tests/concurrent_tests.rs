//! Concurrency tests: the pool bound, hand-off throughput, and balanced
//! accounting under many simultaneous callers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use html2pdf_pool::{ChromePool, PdfOptions, PoolConfigBuilder};

use common::{StubCdpServer, StubSessionFactory};

/// Twelve workers hammering a pool of three: every print succeeds, the
/// session bound is never exceeded, and all counters return to rest.
#[tokio::test]
async fn pool_bound_holds_under_contention() {
    const MAX_SESSIONS: usize = 3;
    const WORKERS: usize = 12;
    const ITERATIONS: usize = 4;

    let server = StubCdpServer::start().await;
    let pool = Arc::new(
        ChromePool::builder()
            .config(
                PoolConfigBuilder::new()
                    .min_sessions(0)
                    .max_sessions(MAX_SESSIONS)
                    .idle_timeout(Duration::from_secs(60))
                    .acquire_timeout(Duration::from_secs(30))
                    .build()
                    .unwrap(),
            )
            .factory(Box::new(StubSessionFactory::new(&server)))
            .build()
            .unwrap(),
    );

    // Sampler asserting the bound while the workers run.
    let sampler_pool = Arc::clone(&pool);
    let sampler = tokio::spawn(async move {
        let mut max_seen = 0usize;
        for _ in 0..100 {
            let stats = sampler_pool.stats();
            assert!(
                stats.total <= MAX_SESSIONS,
                "total exceeded the bound: {}",
                stats
            );
            max_seen = max_seen.max(stats.total);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        max_seen
    });

    let mut workers = JoinSet::new();
    for worker in 0..WORKERS {
        let pool = Arc::clone(&pool);
        workers.spawn(async move {
            for iteration in 0..ITERATIONS {
                let session = pool
                    .acquire()
                    .await
                    .unwrap_or_else(|e| panic!("worker {} iter {}: {}", worker, iteration, e));
                let pdf = session
                    .print_to_pdf(&PdfOptions::default())
                    .await
                    .expect("print against stub");
                assert_eq!(&pdf[..4], b"%PDF");
                drop(session);
            }
        });
    }
    while let Some(result) = workers.join_next().await {
        result.expect("worker task must not panic");
    }

    let max_seen = sampler.await.expect("sampler must not panic");
    assert!(max_seen <= MAX_SESSIONS);

    // Balanced accounting once the dust settles: every acquire was
    // matched by a release.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stats = pool.stats();
    assert_eq!(stats.active, 0, "all sessions released: {}", stats);
    assert_eq!(stats.waiting, 0);
    assert!(stats.total <= MAX_SESSIONS);
    assert_eq!(stats.idle, stats.total);

    // The stub saw at most one connection per session slot.
    assert!(server.connection_count() <= MAX_SESSIONS);

    pool.shutdown().await;
    assert_eq!(pool.stats().total, 0);
}

/// Stats snapshots are safe to read from many tasks while the pool is
/// in motion.
#[tokio::test]
async fn concurrent_stats_access() {
    let server = StubCdpServer::start().await;
    let pool = Arc::new(
        ChromePool::builder()
            .config(
                PoolConfigBuilder::new()
                    .min_sessions(0)
                    .max_sessions(2)
                    .build()
                    .unwrap(),
            )
            .factory(Box::new(StubSessionFactory::new(&server)))
            .build()
            .unwrap(),
    );

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        tasks.spawn(async move {
            for _ in 0..200 {
                let stats = pool.stats();
                assert!(stats.active <= stats.total || stats.total == 0);
            }
        });
    }
    // One task exercising the pool at the same time.
    {
        let pool = Arc::clone(&pool);
        tasks.spawn(async move {
            for _ in 0..5 {
                let session = pool.acquire().await.expect("acquire");
                tokio::time::sleep(Duration::from_millis(20)).await;
                drop(session);
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(result.is_ok(), "task should complete without panic");
    }

    pool.shutdown().await;
}

/// Releases hand sessions directly to waiters: with one session and
/// many queued callers, everyone is served in bounded time and the
/// session count never grows.
#[tokio::test]
async fn handoff_serves_all_waiters() {
    let server = StubCdpServer::start().await;
    let pool = Arc::new(
        ChromePool::builder()
            .config(
                PoolConfigBuilder::new()
                    .min_sessions(0)
                    .max_sessions(1)
                    .acquire_timeout(Duration::from_secs(20))
                    .build()
                    .unwrap(),
            )
            .factory(Box::new(StubSessionFactory::new(&server)))
            .build()
            .unwrap(),
    );

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        tasks.spawn(async move {
            let session = pool.acquire().await.expect("every waiter is served");
            tokio::time::sleep(Duration::from_millis(25)).await;
            drop(session);
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.expect("waiter task must not panic");
    }

    let stats = pool.stats();
    assert_eq!(stats.total, 1, "one session serves everyone: {}", stats);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.waiting, 0);
    assert_eq!(server.connection_count(), 1);

    pool.shutdown().await;
}
