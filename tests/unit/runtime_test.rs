//! Tests for task runners

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_admission::core::TaskRunner;
use prometheus_admission::runtime::{ManualTaskRunner, ThreadTaskRunner};
#[cfg(feature = "tokio-runtime")]
use prometheus_admission::runtime::TokioTaskRunner;

#[test]
fn test_manual_runner_defers_until_drained() {
    let runner = ManualTaskRunner::new();
    let count = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let count = Arc::clone(&count);
        runner.post(Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
    }
    assert_eq!(runner.pending(), 3);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(runner.run_until_idle(), 3);
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert!(!runner.run_next());
}

#[test]
fn test_thread_runner_through_arc() {
    let runner = Arc::new(ThreadTaskRunner::new("arc-runner").unwrap());
    let (tx, rx) = crossbeam_channel::bounded(1);
    // Arc<T> is itself a TaskRunner.
    TaskRunner::post(&runner, Box::new(move || {
        let _ = tx.send(42);
    }));
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    runner.shutdown();
    assert_eq!(runner.executed(), 1);
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_runner_post() {
    let runner = TokioTaskRunner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    runner.post(Box::new(move || {
        tx.send(123).unwrap();
    }));

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_start_abortable_stops_future() {
    let runner = TokioTaskRunner::current();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let abort = runner.start_abortable(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        let _ = tx.send(());
    });
    abort.run();
    // The sender is dropped with the aborted future.
    assert!(tokio::time::timeout(Duration::from_secs(5), rx).await.unwrap().is_err());
}
