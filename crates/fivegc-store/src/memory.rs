//! In-memory store handler

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use fivegc_core::patch::merge_patch;
use fivegc_core::{
    CoreError, EventType, Kind, Object, ObjectKey, ObjectStore, Result, WatchEvent,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Buffered events per kind before slow watchers start lagging
pub const DEFAULT_WATCH_CAPACITY: usize = 1024;

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Object>,
    version: u64,
}

impl State {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

/// In-memory object store
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    channels: Arc<HashMap<Kind, broadcast::Sender<WatchEvent>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }

    /// Create an empty store with a custom per-kind watch buffer
    pub fn with_watch_capacity(capacity: usize) -> Self {
        let channels = Kind::ALL
            .into_iter()
            .map(|kind| (kind, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self {
            state: Arc::new(RwLock::new(State::default())),
            channels: Arc::new(channels),
        }
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// True when nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.objects.is_empty()
    }

    fn publish(&self, event_type: EventType, object: &Object) {
        if let Some(tx) = self.channels.get(&object.kind) {
            // No receivers is fine
            let _ = tx.send(WatchEvent::new(event_type, object.clone()));
        }
        tracing::trace!(
            kind = %object.kind,
            key = %object.key(),
            version = object.metadata.resource_version,
            event = ?event_type,
            "store event"
        );
    }

    fn validate_key(key: &ObjectKey) -> Result<()> {
        if key.name.is_empty() {
            return Err(CoreError::invalid(format!("{}: empty name", key.kind)));
        }
        if key.kind.is_cluster_scoped() != key.namespace.is_empty() {
            return Err(CoreError::invalid(format!(
                "{key}: {} objects must {}have a namespace",
                key.kind,
                if key.kind.is_cluster_scoped() { "not " } else { "" }
            )));
        }
        Ok(())
    }

    /// Commit `next` over `current`, bumping versions. Returns the stored
    /// object unchanged when nothing but metadata differs.
    fn commit(&self, state: &mut State, current: &Object, mut next: Object) -> Object {
        if current.same_content(&next) {
            return current.clone();
        }
        next.metadata.name = current.metadata.name.clone();
        next.metadata.namespace = current.metadata.namespace.clone();
        next.metadata.creation_timestamp = current.metadata.creation_timestamp;
        next.metadata.generation = if next.spec != current.spec {
            current.metadata.generation + 1
        } else {
            current.metadata.generation
        };
        next.metadata.resource_version = state.next_version();
        state.objects.insert(next.key(), next.clone());
        self.publish(EventType::Updated, &next);
        next
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create(&self, mut object: Object) -> Result<Object> {
        let key = object.key();
        Self::validate_key(&key)?;
        let mut state = self.state.write().await;
        if state.objects.contains_key(&key) {
            return Err(CoreError::already_exists(&key));
        }
        object.metadata.resource_version = state.next_version();
        object.metadata.generation = 1;
        object.metadata.creation_timestamp = Some(Utc::now().trunc_subsecs(0));
        state.objects.insert(key, object.clone());
        self.publish(EventType::Added, &object);
        Ok(object)
    }

    async fn get(&self, key: &ObjectKey) -> Result<Object> {
        let state = self.state.read().await;
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::not_found(key))
    }

    async fn list(&self, kind: Kind, namespace: Option<&str>) -> Result<Vec<Object>> {
        let state = self.state.read().await;
        Ok(state
            .objects
            .iter()
            .filter(|(k, _)| k.kind == kind && namespace.map_or(true, |ns| k.namespace == ns))
            .map(|(_, o)| o.clone())
            .collect())
    }

    async fn update(&self, object: Object) -> Result<Object> {
        let key = object.key();
        let mut state = self.state.write().await;
        let current = state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| CoreError::not_found(&key))?;
        let expected = object.metadata.resource_version;
        if expected != 0 && expected != current.metadata.resource_version {
            return Err(CoreError::conflict(
                &key,
                expected,
                current.metadata.resource_version,
            ));
        }
        Ok(self.commit(&mut state, &current, object))
    }

    async fn patch(&self, key: &ObjectKey, patch: &Value) -> Result<Object> {
        if !patch.is_object() {
            return Err(CoreError::invalid("merge patch must be a JSON object"));
        }
        let mut state = self.state.write().await;
        let current = state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::not_found(key))?;
        let mut doc = current.patch_document();
        merge_patch(&mut doc, patch);
        let mut next = current.clone();
        next.apply_patch_document(doc)?;
        Ok(self.commit(&mut state, &current, next))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<Object> {
        let mut state = self.state.write().await;
        let mut removed = state
            .objects
            .remove(key)
            .ok_or_else(|| CoreError::not_found(key))?;
        removed.metadata.resource_version = state.next_version();
        self.publish(EventType::Deleted, &removed);
        Ok(removed)
    }

    fn watch(&self, kind: Kind) -> broadcast::Receiver<WatchEvent> {
        match self.channels.get(&kind) {
            Some(tx) => tx.subscribe(),
            // Every kind gets a channel in the constructor
            None => broadcast::channel(1).1,
        }
    }
}
