//! fivegc core - resource model and store contract
//!
//! Types shared by every network function reconciler, the in-memory store and
//! the HTTP boundary. Nothing here performs I/O.
//!
//! # Contents
//! - [`Kind`], [`ObjectKey`], [`Object`]: versioned, namespaced records with a
//!   free-form `spec` and `status`
//! - [`conditions`]: keyed tri-state conditions and their aggregation
//! - [`patch`]: RFC 7386 merge patch
//! - [`ObjectStore`]: create/get/list/update/patch/delete/watch with optimistic
//!   versioning
//! - [`RetryPolicy`]: bounded backoff for store I/O
//! - [`resources`]: typed spec/status views per function

#![forbid(unsafe_code)]

/// Keyed status conditions
pub mod conditions;

/// Unified error handling
pub mod errors;

/// Resource kinds and groups
pub mod kind;

/// Objects, keys and metadata
pub mod object;

/// JSON merge patch
pub mod patch;

/// Typed spec/status schemas
pub mod resources;

/// Retry and backoff
pub mod retry;

/// Store contract
pub mod store;

pub use conditions::{Condition, ConditionStatus};
pub use errors::{CoreError, Result};
pub use kind::{Group, Kind};
pub use object::{Object, ObjectKey, ObjectMeta, STATE_LABEL};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use store::{EventType, ObjectStore, ObjectStoreExt, StoreError, WatchEvent};
