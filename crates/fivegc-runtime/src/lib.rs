//! fivegc runtime - watch-triggered reconcilers
//!
//! A [`ControlLoop`] names a target (per-object kind or a singleton), the
//! inputs it joins, the predicates that gate events and a pure transform from
//! [`Inputs`] to [`Write`]s. The [`Runtime`] runs every registered loop
//! against one [`ObjectStore`]:
//!
//! - at most one reconcile per target key at a time, distinct keys in parallel
//! - joins re-admit a target when either side changes
//! - writes equal to stored content are skipped, which also ends feedback loops
//! - lost optimistic-concurrency races re-run the reconcile; other failures back
//!   off per [`RetryPolicy`] and escalate as [`ControllerError`] once exhausted

#![forbid(unsafe_code)]

mod control_loop;
mod controller;
mod error;
mod join;
mod predicate;
mod queue;
mod registry;

pub use control_loop::{ControlLoop, Input, Inputs, Join, Joined, KeyFn, Target, TransformFn, Write};
pub use error::{ControllerError, ReconcileError, RuntimeError, TransformError};
pub use join::JoinIndex;
pub use predicate::Predicate;
pub use queue::WorkQueue;
pub use registry::{Shutdown, ShutdownHandle, TaskRegistry};

use controller::Controller;
use fivegc_core::{ObjectStore, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runtime tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Workers per control loop
    pub workers: usize,
    /// Backoff for store failures
    pub retry: RetryPolicy,
    /// Pause before re-running a reconcile that lost a write race
    #[serde(rename = "contention_backoff_ms", with = "millis")]
    pub contention_backoff: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            retry: RetryPolicy::default(),
            contention_backoff: Duration::from_millis(10),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Set of control loops sharing one store and one error channel
pub struct Runtime {
    store: Arc<dyn ObjectStore>,
    config: RuntimeConfig,
    loops: Vec<Arc<ControlLoop>>,
    errors_tx: mpsc::UnboundedSender<ControllerError>,
    errors_rx: Option<mpsc::UnboundedReceiver<ControllerError>>,
    registry: TaskRegistry,
}

impl Runtime {
    /// Empty runtime over a store
    pub fn new(store: Arc<dyn ObjectStore>, config: RuntimeConfig) -> Self {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        Self {
            store,
            config,
            loops: Vec::new(),
            errors_tx,
            errors_rx: Some(errors_rx),
            registry: TaskRegistry::new(),
        }
    }

    /// Register a loop. Names must be unique.
    pub fn register(&mut self, control_loop: ControlLoop) -> Result<(), RuntimeError> {
        if self.loops.iter().any(|l| l.name == control_loop.name) {
            return Err(RuntimeError::DuplicateLoop(control_loop.name));
        }
        validate(&control_loop)?;
        self.loops.push(Arc::new(control_loop));
        Ok(())
    }

    /// Names of registered loops
    pub fn loop_names(&self) -> Vec<&str> {
        self.loops.iter().map(|l| l.name.as_str()).collect()
    }

    /// Sender for native controllers that report on the same channel
    pub fn error_sender(&self) -> mpsc::UnboundedSender<ControllerError> {
        self.errors_tx.clone()
    }

    /// Take the receiving end of the error channel (once)
    pub fn take_errors(&mut self) -> Option<mpsc::UnboundedReceiver<ControllerError>> {
        self.errors_rx.take()
    }

    /// Start every loop. Returns once all loops finished their initial sync;
    /// the loops keep running until `shutdown` fires.
    pub async fn start(&self, shutdown: &Shutdown) -> Result<(), ReconcileError> {
        for spec in &self.loops {
            let controller = Arc::new(Controller::new(
                Arc::clone(spec),
                Arc::clone(&self.store),
                self.config.clone(),
                self.errors_tx.clone(),
            ));
            controller.start(&self.registry, shutdown).await?;
        }
        tracing::info!(loops = self.loops.len(), "runtime started");
        Ok(())
    }

    /// Start, block until `shutdown` fires, then wait for in-flight
    /// reconciles to finish.
    pub async fn run(&self, mut shutdown: Shutdown) -> Result<(), ReconcileError> {
        self.start(&shutdown).await?;
        shutdown.cancelled().await;
        self.join().await;
        Ok(())
    }

    /// Wait for every loop task to finish; call after shutdown fired
    pub async fn join(&self) {
        self.registry.join_all().await;
        tracing::info!("runtime stopped");
    }
}

fn validate(control_loop: &ControlLoop) -> Result<(), RuntimeError> {
    let invalid = |reason: &str| RuntimeError::InvalidLoop {
        name: control_loop.name.clone(),
        reason: reason.to_string(),
    };
    let mut kinds = HashSet::new();
    for input in &control_loop.inputs {
        if !kinds.insert(input.kind) {
            return Err(invalid("an input kind is joined twice"));
        }
        if Some(input.kind) == control_loop.primary_kind() {
            return Err(invalid("the primary kind cannot also be an input"));
        }
        if let (Target::Singleton(_), Join::ForeignKey(_)) = (&control_loop.target, &input.join)
        {
            return Err(invalid("singleton targets have no primary to key on"));
        }
    }
    Ok(())
}
