//! Credential errors.

/// Error type for issuing and verifying credentials
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// Key material is malformed
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// What is wrong with the key
        message: String,
    },

    /// Key file could not be read or written
    #[error("Key file {path}: {message}")]
    KeyFile {
        /// File path
        path: String,
        /// I/O error message
        message: String,
    },

    /// Token is malformed or its signature does not verify
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Reason
        message: String,
    },

    /// Token lifetime is over
    #[error("Token expired at {expired_at}")]
    Expired {
        /// Expiry, seconds since the epoch
        expired_at: i64,
    },

    /// Claims or profile could not be encoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Encoder message
        message: String,
    },
}

impl CredentialError {
    /// Create an invalid key error
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Create a key file error
    pub fn key_file(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::KeyFile {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Create an invalid token error
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
