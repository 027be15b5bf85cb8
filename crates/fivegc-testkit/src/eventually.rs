//! Polling until the reconcilers converge.

use std::future::Future;
use std::time::Duration;

/// How long to wait before giving up
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between probes
pub const INTERVAL: Duration = Duration::from_millis(20);

/// Poll `probe` until it yields a value, panicking with `what` after
/// [`TIMEOUT`]
pub async fn eventually<F, Fut, T>(what: &str, probe: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    eventually_within(what, TIMEOUT, probe).await
}

/// [`eventually`] with an explicit timeout
pub async fn eventually_within<F, Fut, T>(what: &str, timeout: Duration, mut probe: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return value;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out after {timeout:?} waiting for {what}");
        }
        tokio::time::sleep(INTERVAL).await;
    }
}

/// Check that `probe` keeps holding for `period`
pub async fn consistently<F, Fut>(what: &str, period: Duration, mut probe: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + period;
    while tokio::time::Instant::now() < deadline {
        assert!(probe().await, "{what} stopped holding");
        tokio::time::sleep(INTERVAL).await;
    }
}
