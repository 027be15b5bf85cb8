//! Start-up errors.

use fivegc_core::CoreError;
use fivegc_credential::CredentialError;
use fivegc_runtime::{ReconcileError, RuntimeError};

/// A static catalogue could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogueError {
    /// File could not be read
    #[error("cannot read catalogue {path}: {message}")]
    Read {
        /// Catalogue file
        path: String,
        /// I/O error
        message: String,
    },

    /// TOML does not match the catalogue schema
    #[error("malformed {catalogue} catalogue: {message}")]
    Parse {
        /// Which catalogue
        catalogue: &'static str,
        /// Parser message
        message: String,
    },

    /// Two entries share a key
    #[error("duplicate entry {key} in {catalogue} catalogue")]
    Duplicate {
        /// Which catalogue
        catalogue: &'static str,
        /// The repeated key
        key: String,
    },

    /// An entry is missing a required field
    #[error("invalid entry in {catalogue} catalogue: {message}")]
    Invalid {
        /// Which catalogue
        catalogue: &'static str,
        /// What is wrong
        message: String,
    },
}

/// Failure to build or start the system
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Bad configuration value
    #[error("configuration: {0}")]
    Config(String),

    /// Catalogue could not be loaded
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    /// Loop registration failed
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Initial sync failed
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Store rejected a seed write
    #[error(transparent)]
    Store(#[from] CoreError),

    /// Signing key problem
    #[error(transparent)]
    Credential(#[from] CredentialError),
}
