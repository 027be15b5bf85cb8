//! Signing key files: a hex-encoded 32-byte ed25519 seed.

use crate::error::CredentialError;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::path::Path;

/// Fresh random signing key
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Parse a hex seed
pub fn signing_key_from_hex(text: &str) -> Result<SigningKey, CredentialError> {
    let bytes = hex::decode(text.trim()).map_err(|e| CredentialError::invalid_key(e.to_string()))?;
    let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        CredentialError::invalid_key(format!("expected 32 bytes, got {}", bytes.len()))
    })?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Load a signing key from a file holding a hex seed
pub fn load_signing_key(path: &Path) -> Result<SigningKey, CredentialError> {
    let text = std::fs::read_to_string(path).map_err(|e| CredentialError::key_file(path, e))?;
    signing_key_from_hex(&text)
}

/// Generate a key and write its seed to `path`, returning the public half
pub fn generate_key_file(path: &Path) -> Result<VerifyingKey, CredentialError> {
    let key = generate_signing_key();
    std::fs::write(path, format!("{}\n", hex::encode(key.to_bytes())))
        .map_err(|e| CredentialError::key_file(path, e))?;
    tracing::info!(path = %path.display(), "generated signing key");
    Ok(key.verifying_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.hex");
        let public = generate_key_file(&path).unwrap();
        let loaded = load_signing_key(&path).unwrap();
        assert_eq!(loaded.verifying_key(), public);
    }

    #[test]
    fn malformed_seeds_are_rejected() {
        assert!(matches!(
            signing_key_from_hex("zz"),
            Err(CredentialError::InvalidKey { .. })
        ));
        assert!(matches!(
            signing_key_from_hex("abcd"),
            Err(CredentialError::InvalidKey { .. })
        ));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_signing_key(Path::new("/nonexistent/key.hex")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/key.hex"));
    }
}
