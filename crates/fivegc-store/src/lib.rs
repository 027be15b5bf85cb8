//! In-memory object store
//!
//! Implements [`fivegc_core::ObjectStore`] over a single `RwLock`-guarded map.
//! Every write takes the lock, stamps a fresh store-global resource version and
//! publishes the change on the kind's broadcast channel before releasing it,
//! so watchers observe events in version order.

#![forbid(unsafe_code)]

mod memory;

pub use memory::{MemoryStore, DEFAULT_WATCH_CAPACITY};
