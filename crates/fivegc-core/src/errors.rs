//! Unified error type for the resource model and the store contract.
//!
//! Store backends, the reconciler runtime and the boundary all speak this one
//! error type so that conflict and not-found handling can be decided without
//! downcasting.

use crate::object::ObjectKey;
use serde::{Deserialize, Serialize};

/// Error type for store and resource-model operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CoreError {
    /// Invalid input (malformed object, bad key, unknown kind)
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Object does not exist
    #[error("Not found: {key}")]
    NotFound {
        /// Key of the missing object
        key: String,
    },

    /// Create of an object whose key is already taken
    #[error("Already exists: {key}")]
    AlreadyExists {
        /// Key of the existing object
        key: String,
    },

    /// Optimistic concurrency failure: the caller wrote from a stale version
    #[error("Conflict on {key}: expected resource version {expected}, found {found}")]
    Conflict {
        /// Key of the contended object
        key: String,
        /// Version the writer read
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Backend unavailable or otherwise failing
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl CoreError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error for a key
    pub fn not_found(key: &ObjectKey) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    /// Create an already exists error for a key
    pub fn already_exists(key: &ObjectKey) -> Self {
        Self::AlreadyExists {
            key: key.to_string(),
        }
    }

    /// Create a version conflict error
    pub fn conflict(key: &ObjectKey, expected: u64, found: u64) -> Self {
        Self::Conflict {
            key: key.to_string(),
            expected,
            found,
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for errors that mean "re-read and try again" rather than failure
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::AlreadyExists { .. })
    }
}

/// Standard Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
