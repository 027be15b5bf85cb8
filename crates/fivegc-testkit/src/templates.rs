//! Request templates for the user-facing kinds.

use fivegc_core::{Kind, Object, ObjectKey};
use serde_json::{json, Value};

const REGISTRATION: &str = include_str!("templates/registration.json");
const SESSION: &str = include_str!("templates/session.json");
const CONTEXT_RELEASE: &str = include_str!("templates/context_release.json");

/// SUCI of the first subscriber in the built-in identity table
pub const SUBSCRIBER_SUCI: &str = "suci-0-999-01-02-4f2a7b9c8d13e7a5c0";

/// SUPI the built-in table maps [`SUBSCRIBER_SUCI`] to
pub const SUBSCRIBER_SUPI: &str = "imsi-999010000000123";

/// SUCI of the second subscriber in the built-in identity table
pub const SECOND_SUBSCRIBER_SUCI: &str = "suci-0-999-01-02-8e1c5a7d3b9f0e2a14";

fn parse(template: &str) -> Value {
    serde_json::from_str(template).unwrap_or_else(|e| panic!("bad template: {e}"))
}

fn object(kind: Kind, namespace: &str, name: &str, spec: Value) -> Object {
    let mut object = Object::new(&ObjectKey::new(kind, namespace, name));
    object.spec = spec;
    object
}

/// Registration spec that succeeds against the built-in catalogues
pub fn registration_spec() -> Value {
    parse(REGISTRATION)
}

/// Registration request
pub fn registration(namespace: &str, name: &str) -> Object {
    object(Kind::Registration, namespace, name, registration_spec())
}

/// Registration request for another SUCI
pub fn registration_for(namespace: &str, name: &str, suci: &str) -> Object {
    let mut spec = registration_spec();
    spec["mobileIdentity"]["value"] = json!(suci);
    object(Kind::Registration, namespace, name, spec)
}

/// Session spec owned by `guti`
pub fn session_spec(guti: &str, session_id: i64) -> Value {
    let mut spec = parse(SESSION);
    spec["guti"] = json!(guti);
    spec["sessionId"] = json!(session_id);
    spec
}

/// Session request
pub fn session(namespace: &str, name: &str, guti: &str, session_id: i64) -> Object {
    object(Kind::Session, namespace, name, session_spec(guti, session_id))
}

/// ContextRelease request for one session of `guti`
pub fn context_release(namespace: &str, name: &str, guti: &str, session_id: i64) -> Object {
    let mut spec = parse(CONTEXT_RELEASE);
    spec["guti"] = json!(guti);
    spec["sessionId"] = json!(session_id);
    object(Kind::ContextRelease, namespace, name, spec)
}
