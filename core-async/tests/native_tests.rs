//! Integration tests for core-async on the Tokio runtime.
//!
//! These cover the pieces the resolver and the playback orchestrator lean on:
//! spawning, timeouts, cancellation tokens and debounced timers.

use core_async::debounce::Debouncer;
use core_async::{sync, task, time};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test]
async fn test_runtime_available_inside_runtime() {
    assert!(task::runtime_available());
}

#[test]
fn test_runtime_unavailable_outside_runtime() {
    assert!(!task::runtime_available());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_cancellation_token_child() {
    let parent = sync::CancellationToken::new();
    let child = parent.child_token();

    let handle = task::spawn(async move {
        child.cancelled().await;
        "cancelled"
    });

    parent.cancel();
    assert_eq!(handle.await.unwrap(), "cancelled");
}

#[tokio::test]
async fn test_watch_channel_latest_value() {
    let (tx, mut rx) = sync::watch::channel("idle");
    tx.send_replace("resolving");
    tx.send_replace("loading");

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), "loading");
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_coalesces_bursts_per_key() {
    let debouncer = Debouncer::new(time::Duration::from_millis(150));
    let runs = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let runs = Arc::clone(&runs);
        debouncer.schedule("visibility", async move {
            runs.fetch_add(1, Ordering::SeqCst);
        });
        time::sleep(time::Duration::from_millis(20)).await;
    }

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    time::sleep(time::Duration::from_millis(200)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_custom_delay_per_key() {
    let debouncer = Debouncer::new(time::Duration::from_millis(150));
    let runs = Arc::new(AtomicUsize::new(0));

    let fast = Arc::clone(&runs);
    debouncer.schedule_after("hover", time::Duration::from_millis(10), async move {
        fast.fetch_add(1, Ordering::SeqCst);
    });
    let slow = Arc::clone(&runs);
    debouncer.schedule("visibility", async move {
        slow.fetch_add(10, Ordering::SeqCst);
    });

    time::sleep(time::Duration::from_millis(50)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(debouncer.is_pending(&"visibility"));

    debouncer.cancel_all();
    time::sleep(time::Duration::from_millis(200)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
