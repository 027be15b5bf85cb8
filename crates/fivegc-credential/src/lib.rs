//! fivegc credential - signed bearer tokens for UE access to the boundary
//!
//! UDM mints one credential per GUTI: an ed25519-signed compact token scoped
//! to a namespace and a rule set, wrapped in a kubeconfig-shaped
//! [`ConnectionProfile`]. The boundary checks tokens with a [`TokenVerifier`].

#![forbid(unsafe_code)]

mod error;
mod issuer;
mod keys;
mod profile;
mod token;

pub use error::CredentialError;
pub use issuer::{Credential, CredentialIssuer, Ed25519Issuer};
pub use keys::{generate_key_file, generate_signing_key, load_signing_key, signing_key_from_hex};
pub use profile::{ClusterEntry, ConnectionProfile, ContextEntry, ProfileOptions, UserEntry};
pub use token::{sign, Claims, PolicyRule, TokenVerifier, WILDCARD};

pub use ed25519_dalek::{SigningKey, VerifyingKey};
