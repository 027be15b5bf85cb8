//! Object store contract consumed by every reconciler and by the boundary.
//!
//! Backends must stamp a store-global `resourceVersion` on each write, bump
//! `generation` when the spec changes, reject updates carrying a stale version
//! with [`CoreError::Conflict`], and broadcast every committed change on the
//! per-kind watch channel after the write is visible to readers.

use crate::errors::{CoreError, Result};
use crate::kind::Kind;
use crate::object::{Object, ObjectKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Errors surfaced by store operations
pub type StoreError = CoreError;

/// Type of a watch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Object created
    Added,
    /// Object changed
    Updated,
    /// Object removed; the event carries its last state
    Deleted,
}

/// A committed change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// What happened
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// The object after the change (before it, for deletions)
    pub object: Object,
}

impl WatchEvent {
    /// Build an event
    pub fn new(event_type: EventType, object: Object) -> Self {
        Self { event_type, object }
    }
}

/// Typed create/get/list/update/patch/delete with optimistic versioning,
/// plus a per-kind watch stream.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a new object; fails with `AlreadyExists` if the key is taken
    async fn create(&self, object: Object) -> Result<Object>;

    /// Fetch an object
    async fn get(&self, key: &ObjectKey) -> Result<Object>;

    /// List objects of a kind, optionally restricted to one namespace, in
    /// key order
    async fn list(&self, kind: Kind, namespace: Option<&str>) -> Result<Vec<Object>>;

    /// Replace spec, status and labels. A non-zero `resourceVersion` must
    /// match the stored one; zero means "unconditional".
    async fn update(&self, object: Object) -> Result<Object>;

    /// Apply an RFC 7386 merge patch to `{metadata: {labels}, spec, status}`
    async fn patch(&self, key: &ObjectKey, patch: &Value) -> Result<Object>;

    /// Delete an object, returning its last state
    async fn delete(&self, key: &ObjectKey) -> Result<Object>;

    /// Subscribe to changes of one kind
    fn watch(&self, kind: Kind) -> broadcast::Receiver<WatchEvent>;
}

/// Convenience operations built on the core contract
#[async_trait]
pub trait ObjectStoreExt: ObjectStore {
    /// `get` mapping `NotFound` to `None`
    async fn try_get(&self, key: &ObjectKey) -> Result<Option<Object>> {
        match self.get(key).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or update depending on `resourceVersion` (0 = create)
    async fn apply(&self, object: Object) -> Result<Object> {
        if object.metadata.resource_version == 0 {
            self.create(object).await
        } else {
            self.update(object).await
        }
    }

    /// `delete` treating `NotFound` as success
    async fn delete_if_exists(&self, key: &ObjectKey) -> Result<Option<Object>> {
        match self.delete(key).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}
