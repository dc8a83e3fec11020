//! Preparation tests
//!
//! Creation failures, shared in-flight preparation, abandoned acquires and
//! release while preparing. Gated backends hold preparation open so the
//! tests can interleave calls deterministically.

mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use wof_common::{EvictionReason, PoolEvent};
use wof_mp::{CardId, Error};

fn id(name: &str) -> CardId {
    CardId::from(name)
}

#[tokio::test]
async fn test_still_images_fail_with_media_creation() {
    let backend = Arc::new(CountingBackend::default());
    let (pool, dir) = pool_with_backend(2, backend.clone());

    for (name, bytes) in [("png", png_bytes()), ("jpeg", jpeg_bytes())] {
        let result = pool.acquire(name, bytes).await;
        assert!(
            matches!(result, Err(Error::MediaCreation(_))),
            "{} payload should fail",
            name
        );
    }

    // Rejected before anything touched disk or the backend
    assert_eq!(backend.calls(), 0);
    assert_eq!(file_count(dir.path()), 0);
    assert_eq!(pool.live_count().await, 0);
}

#[tokio::test]
async fn test_garbage_payloads_fail_and_leave_no_file() {
    let (pool, dir) = test_pool(2);
    let mut events = pool.subscribe();

    let unknown = pool.acquire("text", garbage_bytes()).await;
    assert!(matches!(unknown, Err(Error::MediaCreation(_))));

    let broken = pool.acquire("broken", broken_mp4_bytes()).await;
    assert!(matches!(broken, Err(Error::MediaCreation(_))));

    assert_eq!(file_count(dir.path()), 0);
    assert_eq!(pool.live_count().await, 0);
    assert_eq!(pool.pending_count().await, 0);

    let failed: Vec<CardId> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event {
            PoolEvent::MediaCreationFailed { card_id, .. } => Some(card_id),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![id("text"), id("broken")]);
}

#[tokio::test]
async fn test_failed_acquire_does_not_disturb_live_handles() {
    let (pool, _dir) = test_pool(1);
    pool.acquire("a", clip()).await.unwrap();

    assert!(pool.acquire("bad", broken_mp4_bytes()).await.is_err());
    assert!(pool.contains(&id("a")).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_acquires_share_one_preparation() {
    let (backend, gate) = GatedBackend::new();
    let (pool, dir) = pool_with_backend(2, backend.clone());

    let first = tokio::spawn({
        let pool = pool.clone();
        async move { pool.acquire("a", clip()).await }
    });
    assert!(wait_until(|| async { backend.calls() == 1 }).await);

    let second = tokio::spawn({
        let pool = pool.clone();
        async move { pool.acquire("a", clip()).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    gate.send(()).unwrap();
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(first.same_resource(&second));
    assert_eq!(backend.calls(), 1);
    assert_eq!(file_count(dir.path()), 1);
    assert_eq!(pool.live_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_preparation_is_torn_down() {
    let (backend, gate) = GatedBackend::new();
    let (pool, dir) = pool_with_backend(2, backend.clone());
    let mut events = pool.subscribe();

    let acquire = tokio::spawn({
        let pool = pool.clone();
        async move { pool.acquire("a", clip()).await }
    });
    assert!(wait_until(|| async { backend.calls() == 1 }).await);

    // Card scrolled away before its player was ready
    acquire.abort();
    assert!(acquire.await.unwrap_err().is_cancelled());

    gate.send(()).unwrap();
    let settled = wait_until(|| async { pool.pending_count().await == 0 }).await;
    assert!(settled);

    assert_eq!(pool.live_count().await, 0);
    assert_eq!(file_count(dir.path()), 0);

    let abandoned = std::iter::from_fn(|| events.try_recv().ok()).any(|event| {
        matches!(
            event,
            PoolEvent::HandleEvicted {
                reason: EvictionReason::Abandoned,
                ..
            }
        )
    });
    assert!(abandoned);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_release_during_preparation() {
    let (backend, gate) = GatedBackend::new();
    let (pool, dir) = pool_with_backend(2, backend.clone());

    let acquire = tokio::spawn({
        let pool = pool.clone();
        async move { pool.acquire("a", clip()).await }
    });
    assert!(wait_until(|| async { backend.calls() == 1 }).await);

    // Nothing live yet; the in-flight preparation is flagged instead
    assert!(!pool.release(&id("a")).await);
    gate.send(()).unwrap();

    let result = acquire.await.unwrap();
    assert!(matches!(result, Err(Error::Released(_))));
    assert_eq!(pool.live_count().await, 0);
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_during_preparation() {
    let (backend, gate) = GatedBackend::new();
    let (pool, dir) = pool_with_backend(2, backend.clone());

    let acquire = tokio::spawn({
        let pool = pool.clone();
        async move { pool.acquire("a", clip()).await }
    });
    assert!(wait_until(|| async { backend.calls() == 1 }).await);

    pool.shutdown().await;
    gate.send(()).unwrap();

    let result = acquire.await.unwrap();
    assert!(matches!(result, Err(Error::ShuttingDown)));
    assert_eq!(file_count(dir.path()), 0);
}
