//! Task registry and the shared shutdown signal.
//!
//! One [`ShutdownHandle`] fans out to every control loop, the native
//! controllers and the boundary. Tasks observe it through [`Shutdown`] and
//! finish their current unit of work before exiting.

use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owner side of the shutdown signal
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// New, untriggered signal
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// A receiver for tasks
    pub fn signal(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }

    /// Tell every holder of a [`Shutdown`] to stop. The flag is stored even
    /// when no receiver is alive, so later subscribers see it.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of the shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Wrap an existing watch receiver
    pub fn from_receiver(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Whether shutdown was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested (or the handle is dropped)
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Tracks spawned tasks so they can be joined on shutdown
#[derive(Debug, Default)]
pub struct TaskRegistry {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task that stops when `shutdown` fires, unless it finishes first
    pub fn spawn_cancellable<F>(&self, mut shutdown: Shutdown, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = fut => {}
            }
        });
        self.handles.lock().push(handle);
    }

    /// Spawn a task that handles shutdown itself
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.lock().push(tokio::spawn(fut));
    }

    /// Number of tracked tasks
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// True when no task is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every tracked task to finish
    pub async fn join_all(&self) {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "task panicked");
                }
            }
        }
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn cancellable_tasks_stop_on_trigger() {
        let handle = ShutdownHandle::new();
        let registry = TaskRegistry::new();
        registry.spawn_cancellable(handle.signal(), std::future::pending());
        assert_eq!(registry.len(), 1);

        handle.trigger();
        tokio::time::timeout(Duration::from_secs(1), registry.join_all())
            .await
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn self_managed_tasks_finish_their_work() {
        let handle = ShutdownHandle::new();
        let registry = TaskRegistry::new();
        let finished = Arc::new(AtomicBool::new(false));
        let mut shutdown = handle.signal();
        let flag = Arc::clone(&finished);
        registry.spawn(async move {
            shutdown.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        handle.trigger();
        registry.join_all().await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn late_subscribers_see_shutdown() {
        let handle = ShutdownHandle::new();
        handle.trigger();
        let mut late = handle.signal();
        assert!(late.is_cancelled());
        late.cancelled().await;
    }

    #[tokio::test]
    async fn trigger_survives_every_receiver_being_dropped() {
        let handle = ShutdownHandle::new();
        drop(handle.signal());
        handle.trigger();

        let registry = TaskRegistry::new();
        registry.spawn_cancellable(handle.signal(), std::future::pending::<()>());
        tokio::time::timeout(Duration::from_secs(1), registry.join_all())
            .await
            .expect("cancellable task should stop at once");
    }
}
