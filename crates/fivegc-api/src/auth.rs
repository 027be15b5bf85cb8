//! Bearer token checks.
//!
//! A request passes when its token verifies against the issuer key, has not
//! expired, names the target namespace and carries a rule for the
//! (group, resource, verb) triple.

use crate::error::ApiError;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use fivegc_core::Kind;
use fivegc_credential::{Claims, TokenVerifier};
use std::fmt;

/// Operation requested on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Read one object
    Get,
    /// Read a collection
    List,
    /// Stream changes
    Watch,
    /// Store a new object
    Create,
    /// Replace an object
    Update,
    /// Merge-patch an object
    Patch,
    /// Remove an object
    Delete,
}

impl Verb {
    /// Name used in policy rules
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Watch => "watch",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("authorization header is not ascii".into()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".into()))
}

/// Check a request against `verifier`; `None` admits everything
pub fn authorize(
    verifier: Option<&TokenVerifier>,
    headers: &HeaderMap,
    kind: Kind,
    verb: Verb,
    namespace: &str,
) -> Result<Option<Claims>, ApiError> {
    let Some(verifier) = verifier else {
        return Ok(None);
    };
    let claims = verifier.verify(bearer(headers)?, chrono::Utc::now().timestamp())?;
    let group = kind.group();
    if !claims.allows(group.as_str(), kind.resource(), verb.as_str(), namespace) {
        tracing::warn!(
            subject = %claims.sub,
            %group,
            resource = kind.resource(),
            %verb,
            namespace,
            "request denied"
        );
        return Err(ApiError::Forbidden(format!(
            "{} may not {verb} {group}/{} in namespace {namespace:?}",
            claims.sub,
            kind.resource()
        )));
    }
    Ok(Some(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use fivegc_credential::{generate_signing_key, sign, PolicyRule};

    fn setup(exp_offset: i64) -> (TokenVerifier, HeaderMap) {
        let key = generate_signing_key();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "guti-1".into(),
            namespaces: vec!["guti-1".into()],
            rules: vec![PolicyRule::new(&["amf"], &["sessions"], &["*"])],
            iat: now,
            exp: now + exp_offset,
        };
        let token = sign(&key, &claims).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        (TokenVerifier::new(key.verifying_key()), headers)
    }

    #[test]
    fn disabled_auth_admits_anonymous() {
        let out = authorize(None, &HeaderMap::new(), Kind::Session, Verb::Create, "x").unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn token_scoped_to_namespace_and_resource() {
        let (verifier, headers) = setup(60);
        let claims =
            authorize(Some(&verifier), &headers, Kind::Session, Verb::Create, "guti-1").unwrap();
        assert_eq!(claims.unwrap().sub, "guti-1");

        let other_ns = authorize(Some(&verifier), &headers, Kind::Session, Verb::Get, "guti-2");
        assert_eq!(other_ns.unwrap_err().status(), StatusCode::FORBIDDEN);

        let other_kind =
            authorize(Some(&verifier), &headers, Kind::Registration, Verb::Get, "guti-1");
        assert_eq!(other_kind.unwrap_err().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_or_expired_token_is_unauthorized() {
        let (verifier, headers) = setup(-1);
        let expired = authorize(Some(&verifier), &headers, Kind::Session, Verb::Get, "guti-1");
        assert_eq!(expired.unwrap_err().status(), StatusCode::UNAUTHORIZED);

        let missing = authorize(
            Some(&verifier),
            &HeaderMap::new(),
            Kind::Session,
            Verb::Get,
            "guti-1",
        );
        assert_eq!(missing.unwrap_err().status(), StatusCode::UNAUTHORIZED);
    }
}
