//! Execution of one declared control loop: watch pumps feed the join index,
//! which feeds the work queue, which feeds a pool of workers.

use crate::control_loop::{ControlLoop, Inputs, Join, Target, Write};
use crate::error::{ControllerError, ReconcileError};
use crate::join::JoinIndex;
use crate::queue::WorkQueue;
use crate::registry::{Shutdown, TaskRegistry};
use crate::RuntimeConfig;
use fivegc_core::{EventType, Kind, ObjectKey, ObjectStore, ObjectStoreExt, WatchEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

pub(crate) struct Controller {
    spec: Arc<ControlLoop>,
    store: Arc<dyn ObjectStore>,
    config: RuntimeConfig,
    joins: Mutex<JoinIndex>,
    queue: Arc<WorkQueue<ObjectKey>>,
    attempts: Mutex<HashMap<ObjectKey, u32>>,
    errors: mpsc::UnboundedSender<ControllerError>,
}

impl Controller {
    pub(crate) fn new(
        spec: Arc<ControlLoop>,
        store: Arc<dyn ObjectStore>,
        config: RuntimeConfig,
        errors: mpsc::UnboundedSender<ControllerError>,
    ) -> Self {
        Self {
            spec,
            store,
            config,
            joins: Mutex::new(JoinIndex::new()),
            queue: Arc::new(WorkQueue::new()),
            attempts: Mutex::new(HashMap::new()),
            errors,
        }
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    /// Subscribe, run the initial sync, then spawn pumps and workers.
    pub(crate) async fn start(
        self: Arc<Self>,
        registry: &TaskRegistry,
        shutdown: &Shutdown,
    ) -> Result<(), ReconcileError> {
        let kinds = self.spec.watched_kinds();
        let receivers: Vec<_> = kinds.iter().map(|k| (*k, self.store.watch(*k))).collect();

        for kind in &kinds {
            self.resync(*kind).await?;
        }
        if let Target::Singleton(key) = &self.spec.target {
            self.queue.add(key.clone());
        }

        for (kind, rx) in receivers {
            let this = Arc::clone(&self);
            registry.spawn_cancellable(shutdown.clone(), this.pump(kind, rx));
        }
        for _ in 0..self.config.workers.max(1) {
            let this = Arc::clone(&self);
            registry.spawn(this.work(shutdown.clone()));
        }

        tracing::info!(
            loop_name = self.name(),
            kinds = ?kinds,
            workers = self.config.workers,
            "control loop started"
        );
        Ok(())
    }

    fn enqueue(&self, event: &WatchEvent) {
        let targets = self.joins.lock().route(&self.spec, event);
        for target in targets {
            self.queue.add(target);
        }
    }

    /// List a kind and route every object, synthesizing deletions for objects
    /// that disappeared while we were not listening.
    async fn resync(&self, kind: Kind) -> Result<(), ReconcileError> {
        let live = self.store.list(kind, None).await?;
        let live_keys: HashSet<ObjectKey> = live.iter().map(|o| o.key()).collect();
        let gone: Vec<_> = self
            .joins
            .lock()
            .seen_of_kind(kind)
            .into_iter()
            .filter(|o| !live_keys.contains(&o.key()))
            .collect();
        for object in gone {
            self.enqueue(&WatchEvent::new(EventType::Deleted, object));
        }
        for object in live {
            self.enqueue(&WatchEvent::new(EventType::Added, object));
        }
        Ok(())
    }

    async fn pump(self: Arc<Self>, kind: Kind, mut rx: broadcast::Receiver<WatchEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.enqueue(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(
                        loop_name = self.name(),
                        kind = %kind,
                        missed,
                        "watch lagged, resyncing"
                    );
                    let policy = self.config.retry.clone();
                    let resynced = policy.execute(|| self.resync(kind)).await;
                    if let Err(error) = resynced {
                        tracing::error!(
                            loop_name = self.name(),
                            kind = %kind,
                            error = %error,
                            "resync failed"
                        );
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn work(self: Arc<Self>, mut shutdown: Shutdown) {
        loop {
            let key = tokio::select! {
                _ = shutdown.cancelled() => break,
                key = self.queue.next() => key,
            };

            let result = self.reconcile(&key).await;
            self.queue.done(&key);
            self.handle_result(key, result);
        }
    }

    fn handle_result(&self, key: ObjectKey, result: Result<(), ReconcileError>) {
        match result {
            Ok(()) => {
                self.attempts.lock().remove(&key);
                self.joins.lock().settle(&key);
            }
            Err(error) if error.is_contention() => {
                tracing::debug!(
                    loop_name = self.name(),
                    target = %key,
                    error = %error,
                    "write raced, re-running"
                );
                self.queue.add_after(key, self.config.contention_backoff);
            }
            Err(error) => {
                let attempt = {
                    let mut attempts = self.attempts.lock();
                    let n = attempts.entry(key.clone()).or_insert(0);
                    *n += 1;
                    *n
                };
                let retry = &self.config.retry;
                if attempt <= retry.max_attempts {
                    let delay = retry.calculate_delay(attempt - 1);
                    tracing::warn!(
                        loop_name = self.name(),
                        target = %key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "reconcile failed, retrying"
                    );
                    self.queue.add_after(key, delay);
                } else {
                    self.attempts.lock().remove(&key);
                    let report = ControllerError {
                        loop_name: self.spec.name.clone(),
                        target: key.clone(),
                        error,
                    };
                    tracing::error!(error = %report, "retries exhausted");
                    let _ = self.errors.send(report);
                    self.queue.add_after(key, retry.max_delay);
                }
            }
        }
    }

    async fn load(&self, target: &ObjectKey) -> Result<Inputs, ReconcileError> {
        let primary = self.store.try_get(target).await?;
        let tombstone = match (&primary, &self.spec.target) {
            (None, Target::Kind(_)) => self.joins.lock().tombstone(target),
            _ => None,
        };
        let mut inputs = Inputs::new(target.clone())
            .with_primary(primary)
            .with_tombstone(tombstone);

        for input in &self.spec.inputs {
            inputs = match &input.join {
                Join::SameKey => {
                    let joined = self.store.try_get(&target.with_kind(input.kind)).await?;
                    inputs.with_one(input.kind, joined)
                }
                Join::Singleton(key) => {
                    let joined = self.store.try_get(key).await?;
                    inputs.with_one(input.kind, joined)
                }
                Join::ForeignKey(f) => {
                    let fk = inputs.primary_or_tombstone().and_then(f);
                    let joined = match fk {
                        Some(fk) => self.store.try_get(&fk).await?,
                        None => None,
                    };
                    inputs.with_one(input.kind, joined)
                }
                Join::Members => {
                    let members = self.store.list(input.kind, None).await?;
                    inputs.with_many(input.kind, members)
                }
            };
        }
        Ok(inputs)
    }

    async fn reconcile(&self, target: &ObjectKey) -> Result<(), ReconcileError> {
        let inputs = self.load(target).await?;
        let writes = self.spec.reconcile(&inputs)?;
        tracing::debug!(
            loop_name = self.name(),
            target = %target,
            writes = writes.len(),
            "reconciled"
        );
        for write in writes {
            self.commit(write).await?;
        }
        Ok(())
    }

    async fn commit(&self, write: Write) -> Result<(), ReconcileError> {
        match write {
            Write::Apply(object) => {
                if object.metadata.resource_version == 0 {
                    if let Some(current) = self.store.try_get(&object.key()).await? {
                        if current.same_content(&object) {
                            return Ok(());
                        }
                    }
                }
                self.store.apply(object).await?;
            }
            Write::Patch { key, patch } => match self.store.patch(&key, &patch).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            },
            Write::Delete(key) => {
                self.store.delete_if_exists(&key).await?;
            }
        }
        Ok(())
    }
}
