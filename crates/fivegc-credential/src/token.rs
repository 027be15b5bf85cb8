//! Compact signed bearer tokens.
//!
//! Layout: `base64url(header).base64url(claims).base64url(signature)` with an
//! ed25519 signature over the first two segments joined by `.`.

use crate::error::CredentialError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Wildcard accepted in every rule field
pub const WILDCARD: &str = "*";

/// RBAC-style grant
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// `get`, `list`, `watch`, `create`, `update`, `patch`, `delete` or `*`
    pub verbs: Vec<String>,
    /// Function groups
    pub api_groups: Vec<String>,
    /// Lower-case plural resource names
    pub resources: Vec<String>,
}

impl PolicyRule {
    /// Build a rule from string slices
    pub fn new(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> Self {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            verbs: owned(verbs),
            api_groups: owned(api_groups),
            resources: owned(resources),
        }
    }

    /// Whether the rule grants `verb` on `group/resource`
    pub fn allows(&self, group: &str, resource: &str, verb: &str) -> bool {
        fn hit(set: &[String], value: &str) -> bool {
            set.iter().any(|s| s == WILDCARD || s == value)
        }
        hit(&self.api_groups, group) && hit(&self.resources, resource) && hit(&self.verbs, verb)
    }
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the GUTI for UE credentials
    pub sub: String,
    /// Namespaces the bearer may touch
    pub namespaces: Vec<String>,
    /// Grants inside those namespaces
    pub rules: Vec<PolicyRule>,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

impl Claims {
    /// Whether the claims grant `verb` on `group/resource` in `namespace`
    pub fn allows(&self, group: &str, resource: &str, verb: &str, namespace: &str) -> bool {
        let in_scope = self
            .namespaces
            .iter()
            .any(|ns| ns == WILDCARD || ns == namespace);
        in_scope && self.rules.iter().any(|r| r.allows(group, resource, verb))
    }
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn eddsa() -> Self {
        Self {
            alg: "EdDSA".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Sign claims into a compact token
pub fn sign(key: &SigningKey, claims: &Claims) -> Result<String, CredentialError> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&Header::eddsa())?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");
    let signature = key.sign(signing_input.as_bytes());
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

/// Checks tokens minted by the matching signing key
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: VerifyingKey,
}

impl TokenVerifier {
    /// Verifier for one public key
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Verify the signature and expiry, returning the claims
    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, CredentialError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::invalid_token("expected three segments"));
        };

        let header: Header = serde_json::from_slice(&decode(header)?)
            .map_err(|e| CredentialError::invalid_token(e.to_string()))?;
        if header.alg != "EdDSA" {
            return Err(CredentialError::invalid_token(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }

        let signature_bytes: [u8; 64] = decode(signature)?
            .as_slice()
            .try_into()
            .map_err(|_| CredentialError::invalid_token("signature must be 64 bytes"))?;
        let signing_input_len = token.len() - signature.len() - 1;
        self.key
            .verify(
                &token.as_bytes()[..signing_input_len],
                &Signature::from_bytes(&signature_bytes),
            )
            .map_err(|e| CredentialError::invalid_token(e.to_string()))?;

        let claims: Claims = serde_json::from_slice(&decode(payload)?)
            .map_err(|e| CredentialError::invalid_token(e.to_string()))?;
        if claims.exp <= now {
            return Err(CredentialError::Expired {
                expired_at: claims.exp,
            });
        }
        Ok(claims)
    }
}

fn decode(segment: &str) -> Result<Vec<u8>, CredentialError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CredentialError::invalid_token(e.to_string()))
}
