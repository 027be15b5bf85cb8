//! Runtime error types.

use fivegc_core::{CoreError, ObjectKey};

/// A transform could not produce writes
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// An input could not be decoded into its typed view
    #[error("cannot decode {key}: {message}")]
    Decode {
        /// Offending object
        key: String,
        /// Decoder message
        message: String,
    },

    /// Building an output failed
    #[error("cannot build output: {0}")]
    Output(#[from] CoreError),
}

impl TransformError {
    /// Decode failure for an object
    pub fn decode(key: &ObjectKey, message: impl Into<String>) -> Self {
        Self::Decode {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Why one reconcile failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// Store I/O failed
    #[error("store: {0}")]
    Store(#[from] CoreError),

    /// The transform failed
    #[error("transform: {0}")]
    Transform(#[from] TransformError),
}

impl ReconcileError {
    /// Lost an optimistic concurrency race; re-read and run again
    pub fn is_contention(&self) -> bool {
        matches!(self, ReconcileError::Store(e) if e.is_contention())
    }
}

/// Escalated failure, sent on the error channel after retries run out
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("controller {loop_name}: error processing {target}: {error}")]
pub struct ControllerError {
    /// Loop (or native controller) name
    pub loop_name: String,
    /// Reconcile target
    pub target: ObjectKey,
    /// Last error
    pub error: ReconcileError,
}

/// Loop registration was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Two loops share a name
    #[error("duplicate control loop name: {0}")]
    DuplicateLoop(String),

    /// The declaration cannot be executed
    #[error("invalid control loop {name}: {reason}")]
    InvalidLoop {
        /// Loop name
        name: String,
        /// What is wrong
        reason: String,
    },
}
