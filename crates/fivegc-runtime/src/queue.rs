//! De-duplicating work queue with per-key exclusion.
//!
//! A key is either pending, in flight, or both (dirty). A key added while in
//! flight is parked and re-queued when the worker reports it done, so at most
//! one reconcile per key runs at any time and no trigger is lost.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug)]
struct QueueState<K> {
    pending: VecDeque<K>,
    queued: HashSet<K>,
    active: HashSet<K>,
    dirty: HashSet<K>,
}

/// Work queue shared by the router and the workers of one loop
#[derive(Debug)]
pub struct WorkQueue<K> {
    state: Mutex<QueueState<K>>,
    notify: Notify,
}

impl<K: Clone + Eq + Hash + Send + 'static> WorkQueue<K> {
    /// Empty queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                queued: HashSet::new(),
                active: HashSet::new(),
                dirty: HashSet::new(),
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueue a key unless it is already pending
    pub fn add(&self, key: K) {
        let mut state = self.state.lock();
        if state.active.contains(&key) {
            state.dirty.insert(key);
            return;
        }
        if state.queued.insert(key.clone()) {
            state.pending.push_back(key);
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Enqueue a key after a delay
    pub fn add_after(self: &Arc<Self>, key: K, delay: Duration) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    fn try_next(&self) -> Option<K> {
        let mut state = self.state.lock();
        let key = state.pending.pop_front()?;
        state.queued.remove(&key);
        state.active.insert(key.clone());
        let more = !state.pending.is_empty();
        drop(state);
        if more {
            self.notify.notify_one();
        }
        Some(key)
    }

    /// Wait for the next key and mark it in flight
    pub async fn next(&self) -> K {
        loop {
            let notified = self.notify.notified();
            if let Some(key) = self.try_next() {
                return key;
            }
            notified.await;
        }
    }

    /// Release an in-flight key, re-queueing it if it was triggered meanwhile
    pub fn done(&self, key: &K) {
        let requeue = {
            let mut state = self.state.lock();
            state.active.remove(key);
            state.dirty.remove(key)
        };
        if requeue {
            self.add(key.clone());
        }
    }

    /// Number of pending keys
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Clone + Eq + Hash + Send + 'static> Default for WorkQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
