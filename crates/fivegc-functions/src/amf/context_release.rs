//! ContextRelease: the idle/active toggle.
//!
//! A ready ContextRelease sets `spec.idle` on the SessionContext it resolved
//! to; losing readiness or being deleted clears it again. The SMF does the
//! rest.

use crate::support::{rows, status};
use fivegc_core::conditions::{set_condition, status_of};
use fivegc_core::resources::amf::{
    ActiveRegistration, ContextReleaseSpec, ContextReleaseStatus, ACTIVE_REGISTRATIONS,
};
use fivegc_core::resources::condition::READY;
use fivegc_core::resources::smf::{ActiveSession, ACTIVE_SESSIONS};
use fivegc_core::resources::ObjectRef;
use fivegc_core::{Condition, ConditionStatus, Kind, Object, ObjectKey};
use fivegc_runtime::{ControlLoop, Input, Inputs, Join, Predicate, Target, TransformError, Write};
use serde_json::{json, Value};

/// Condition reasons
pub mod reason {
    /// GUTI missing
    pub const GUTI_NOT_SPECIFIED: &str = "GutiNotSpecified";
    /// GUTI has no active registration
    pub const GUTI_NOT_FOUND: &str = "GutiNotFound";
    /// No active session with that id
    pub const SESSION_NOT_FOUND: &str = "SessionNotFound";
    /// Spec does not decode
    pub const INVALID_SPEC: &str = "InvalidSpec";
    /// Release resolved to a session
    pub const CONTEXT_RELEASE_ACCEPTED: &str = "ContextReleaseAccepted";
}

/// Resolve a release request to the session it idles
pub fn resolve(
    request: &ContextReleaseSpec,
    registrations: &[ActiveRegistration],
    sessions: &[ActiveSession],
) -> Result<ObjectRef, (&'static str, String)> {
    let guti = request.guti.as_deref().unwrap_or_default();
    if guti.is_empty() {
        return Err((reason::GUTI_NOT_SPECIFIED, "guti is required".into()));
    }
    if !registrations.iter().any(|r| r.guti == guti) {
        return Err((reason::GUTI_NOT_FOUND, format!("{guti} is not registered")));
    }
    let session_id = request.session_id.unwrap_or_default();
    sessions
        .iter()
        .find(|s| s.guti == guti && s.session_id == session_id)
        .map(|s| ObjectRef::new(&s.namespace, &s.name))
        .ok_or_else(|| {
            (
                reason::SESSION_NOT_FOUND,
                format!("{guti} has no active session {session_id}"),
            )
        })
}

/// Validate the release against the active tables
pub fn session_context_release_input() -> ControlLoop {
    let registrations = ObjectKey::cluster(Kind::ActiveRegistrationTable, ACTIVE_REGISTRATIONS);
    let sessions = ObjectKey::cluster(Kind::ActiveSessionTable, ACTIVE_SESSIONS);
    ControlLoop::new(
        "session-context-release-input",
        Target::Kind(Kind::ContextRelease),
        |inputs: &Inputs| {
            let Some(release) = &inputs.primary else {
                return Ok(vec![]);
            };
            let registrations: Vec<ActiveRegistration> =
                rows(inputs.one(Kind::ActiveRegistrationTable))?;
            let sessions: Vec<ActiveSession> = rows(inputs.one(Kind::ActiveSessionTable))?;
            let mut current: ContextReleaseStatus = status(release)?;

            let verdict = match release.spec_as::<ContextReleaseSpec>() {
                Ok(request) => resolve(&request, &registrations, &sessions),
                Err(e) => Err((reason::INVALID_SPEC, e.to_string())),
            };
            let ready = match verdict {
                Ok(session) => {
                    current.session = Some(session);
                    Condition::new(READY, ConditionStatus::True, reason::CONTEXT_RELEASE_ACCEPTED)
                }
                // the previous session ref stays so the output can clear idle
                Err((why, message)) => {
                    Condition::new(READY, ConditionStatus::False, why).with_message(message)
                }
            };
            set_condition(&mut current.conditions, ready);

            let mut next = release.clone();
            next.set_status(&current)?;
            Ok(vec![Write::Apply(next)])
        },
    )
    .with_predicate(Predicate::GenerationChanged)
    .with_input(Input::new(
        Kind::ActiveRegistrationTable,
        Join::Singleton(registrations),
    ))
    .with_input(Input::new(Kind::ActiveSessionTable, Join::Singleton(sessions)))
}

fn idle_patch(release: &Object, idle: bool) -> Result<Option<Write>, TransformError> {
    let current: ContextReleaseStatus = status(release)?;
    let idle = if idle { Value::Bool(true) } else { Value::Null };
    Ok(current.session.map(|session| Write::Patch {
        key: ObjectKey::new(Kind::SessionContext, session.namespace, session.name),
        patch: json!({"spec": {"idle": idle}}),
    }))
}

/// Drive `spec.idle` on the resolved SessionContext
pub fn session_context_release_output() -> ControlLoop {
    ControlLoop::new(
        "session-context-release-output",
        Target::Kind(Kind::ContextRelease),
        |inputs: &Inputs| {
            let write = match (&inputs.primary, &inputs.tombstone) {
                (Some(release), _) => {
                    let ready = status_of(&release.conditions(), READY) == ConditionStatus::True;
                    idle_patch(release, ready)?
                }
                (None, Some(gone)) => idle_patch(gone, false)?,
                (None, None) => None,
            };
            Ok(write.into_iter().collect())
        },
    )
    .with_predicate(Predicate::condition_true(READY))
}
