//! A running system over an in-memory store.

use crate::eventually::eventually;
use fivegc_core::conditions::find;
use fivegc_core::{Condition, ConditionStatus, Kind, Object, ObjectKey, ObjectStore, ObjectStoreExt};
use fivegc_functions::{System, SystemConfig};
use fivegc_runtime::ShutdownHandle;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Configuration tuned for tests: plain HTTP, no auth, quick retries
pub fn test_config() -> SystemConfig {
    let mut config = SystemConfig::default();
    config.api.http_mode = true;
    config.api.disable_auth = true;
    config.runtime.workers = 2;
    config.runtime.retry = fivegc_core::RetryPolicy::fixed(Duration::from_millis(10))
        .with_max_attempts(3);
    config
}

/// Install a test subscriber once; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A started [`System`] and its store
pub struct TestSystem {
    /// Store every loop runs against
    pub store: Arc<dyn ObjectStore>,
    system: System,
    shutdown: ShutdownHandle,
}

impl TestSystem {
    /// Start with [`test_config`]
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    /// Start with an explicit configuration
    pub async fn start_with(config: SystemConfig) -> Self {
        init_tracing();
        let mut system =
            System::new(config).unwrap_or_else(|e| panic!("system construction failed: {e}"));
        let shutdown = ShutdownHandle::new();
        system
            .start(&shutdown.signal())
            .await
            .unwrap_or_else(|e| panic!("system start failed: {e}"));
        Self {
            store: system.store(),
            system,
            shutdown,
        }
    }

    /// The wrapped system
    pub fn system(&self) -> &System {
        &self.system
    }

    /// Store a new object
    pub async fn create(&self, object: Object) -> Object {
        self.store
            .create(object)
            .await
            .unwrap_or_else(|e| panic!("create failed: {e}"))
    }

    /// Delete an object
    pub async fn delete(&self, key: &ObjectKey) {
        self.store
            .delete(key)
            .await
            .unwrap_or_else(|e| panic!("delete of {key} failed: {e}"));
    }

    /// Current state of an object
    pub async fn get(&self, key: &ObjectKey) -> Option<Object> {
        self.store
            .try_get(key)
            .await
            .unwrap_or_else(|e| panic!("get of {key} failed: {e}"))
    }

    /// Wait until `key` carries condition `type_` with `status`
    pub async fn wait_condition(
        &self,
        key: &ObjectKey,
        type_: &str,
        status: ConditionStatus,
    ) -> Condition {
        eventually(&format!("{key} {type_}={status:?}"), || async {
            let object = self.get(key).await?;
            find(&object.conditions(), type_)
                .filter(|c| c.status == status)
                .cloned()
        })
        .await
    }

    /// Wait until `key` exists
    pub async fn wait_exists(&self, key: &ObjectKey) -> Object {
        eventually(&format!("{key} to exist"), || self.get(key)).await
    }

    /// Wait until `key` is gone
    pub async fn wait_gone(&self, key: &ObjectKey) {
        eventually(&format!("{key} to be deleted"), || async {
            self.get(key).await.is_none().then_some(())
        })
        .await;
    }

    /// Rows of an aggregate table, empty while it does not exist
    pub async fn table(&self, kind: Kind, name: &str) -> Vec<Value> {
        let Some(table) = self.get(&ObjectKey::cluster(kind, name)).await else {
            return Vec::new();
        };
        table.spec.as_array().cloned().unwrap_or_default()
    }

    /// Wait until an aggregate table has `len` rows
    pub async fn wait_table_len(&self, kind: Kind, name: &str, len: usize) -> Vec<Value> {
        eventually(&format!("{name} to hold {len} rows"), || async {
            let rows = self.table(kind, name).await;
            (rows.len() == len).then_some(rows)
        })
        .await
    }

    /// Number of stored objects of `kind` whose `type_` condition is True
    pub async fn count_true(&self, kind: Kind, type_: &str) -> usize {
        self.store
            .list(kind, None)
            .await
            .unwrap_or_else(|e| panic!("list failed: {e}"))
            .iter()
            .filter(|o| find(&o.conditions(), type_).is_some_and(Condition::is_true))
            .count()
    }

    /// Trigger shutdown and wait for every task
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.system.join().await;
    }
}
