//! Credential issuance.

use crate::error::CredentialError;
use crate::profile::{ConnectionProfile, ProfileOptions};
use crate::token::{sign, Claims, PolicyRule, TokenVerifier};
use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use std::time::Duration;

/// A minted bearer token and the profile that embeds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Compact signed token
    pub token: String,
    /// Connection profile for the subject
    pub profile: ConnectionProfile,
}

/// Mints credentials for a subject
pub trait CredentialIssuer: Send + Sync {
    /// Issue a credential scoped to `namespaces` with `rules`, valid for `ttl`
    fn issue_credential(
        &self,
        subject: &str,
        namespaces: &[String],
        rules: &[PolicyRule],
        ttl: Duration,
    ) -> Result<Credential, CredentialError>;
}

/// Issuer backed by an ed25519 signing key
#[derive(Debug, Clone)]
pub struct Ed25519Issuer {
    key: SigningKey,
    options: ProfileOptions,
}

impl Ed25519Issuer {
    /// Issuer signing with `key` and pointing profiles per `options`
    pub fn new(key: SigningKey, options: ProfileOptions) -> Self {
        Self { key, options }
    }

    /// Verifier for tokens this issuer mints
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(self.key.verifying_key())
    }

    /// Profile options in use
    pub fn options(&self) -> &ProfileOptions {
        &self.options
    }

    /// Like [`CredentialIssuer::issue_credential`] with an explicit clock
    pub fn issue_at(
        &self,
        subject: &str,
        namespaces: &[String],
        rules: &[PolicyRule],
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        if subject.is_empty() {
            return Err(CredentialError::invalid_token("empty subject"));
        }
        let iat = now.timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| CredentialError::invalid_token("ttl out of range"))?;
        let claims = Claims {
            sub: subject.to_string(),
            namespaces: namespaces.to_vec(),
            rules: rules.to_vec(),
            iat,
            exp: iat.saturating_add(ttl_secs),
        };
        let token = sign(&self.key, &claims)?;
        let namespace = namespaces.first().map(String::as_str).unwrap_or(subject);
        let profile = ConnectionProfile::single(&self.options, subject, namespace, token.clone());
        tracing::debug!(subject, exp = claims.exp, "issued credential");
        Ok(Credential { token, profile })
    }
}

impl CredentialIssuer for Ed25519Issuer {
    fn issue_credential(
        &self,
        subject: &str,
        namespaces: &[String],
        rules: &[PolicyRule],
        ttl: Duration,
    ) -> Result<Credential, CredentialError> {
        self.issue_at(subject, namespaces, rules, ttl, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_signing_key;
    use chrono::TimeZone;

    #[test]
    fn issued_credential_round_trips_through_the_verifier() {
        let issuer = Ed25519Issuer::new(generate_signing_key(), ProfileOptions::default());
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rules = vec![PolicyRule::new(&["amf"], &["sessions"], &["*"])];
        let credential = issuer
            .issue_at(
                "guti-a",
                &["guti-a".to_string()],
                &rules,
                Duration::from_secs(3600),
                now,
            )
            .unwrap();

        let claims = issuer
            .verifier()
            .verify(&credential.token, now.timestamp() + 10)
            .unwrap();
        assert_eq!(claims.sub, "guti-a");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.rules, rules);
        assert_eq!(
            credential.profile.current_token(),
            Some(credential.token.as_str())
        );
    }

    #[test]
    fn profile_has_one_cluster_and_one_user() {
        let issuer = Ed25519Issuer::new(
            generate_signing_key(),
            ProfileOptions {
                server: "https://10.0.0.1:9443".into(),
                cluster_name: "core".into(),
                insecure: true,
            },
        );
        let credential = issuer
            .issue_credential("guti-b", &["guti-b".to_string()], &[], Duration::from_secs(60))
            .unwrap();
        let doc = serde_json::to_value(&credential.profile).unwrap();
        let clusters = doc["clusters"].as_object().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters["core"]["server"], "https://10.0.0.1:9443");
        assert_eq!(clusters["core"]["insecure-skip-tls-verify"], true);
        let users = doc["users"].as_object().unwrap();
        assert_eq!(users.len(), 1);
        assert!(!users["guti-b"]["token"].as_str().unwrap().is_empty());
        assert_eq!(doc["contexts"]["core"]["namespace"], "guti-b");
        assert_eq!(doc["current-context"], "core");
    }

    #[test]
    fn empty_subject_is_refused() {
        let issuer = Ed25519Issuer::new(generate_signing_key(), ProfileOptions::default());
        assert!(issuer
            .issue_credential("", &[], &[], Duration::from_secs(1))
            .is_err());
    }
}
