//! Session pipeline: validate the request against the active registrations,
//! hand a SessionContext to the SMF and project its outcome back.

use crate::smf::{refresh_ready as refresh_session_ready, SESSION_STEPS};
use crate::support::{edit, rows, spec, status};
use fivegc_core::conditions::{find, remove_condition, set_condition};
use fivegc_core::resources::amf::{
    ActiveRegistration, SessionSpec, SessionStatus, ACTIVE_REGISTRATIONS,
};
use fivegc_core::resources::condition::VALIDATED;
use fivegc_core::resources::smf::{SessionContextSpec, SessionContextStatus};
use fivegc_core::{Condition, ConditionStatus, Kind, ObjectKey};
use fivegc_runtime::{ControlLoop, Input, Inputs, Join, Predicate, Target, Write};

use super::SUPPORTED_SLICE;

/// Condition reasons
pub mod reason {
    /// No network configuration requests
    pub const NETWORK_CONFIGURATION_NOT_SPECIFIED: &str = "NetworkConfigurationNotSpecified";
    /// No QoS flows
    pub const QOS_FLOWS_NOT_SPECIFIED: &str = "QosFlowsNotSpecified";
    /// No QoS rules
    pub const QOS_RULES_NOT_SPECIFIED: &str = "QosRulesNotSpecified";
    /// GUTI missing (spelling is part of the wire contract)
    pub const GUTI_NOT_SPECIFIED: &str = "GutiNotSpeficied";
    /// Slice type not served
    pub const NSSAI_NOT_PERMITTED: &str = "NSSAINotPermitted";
    /// GUTI has no active registration
    pub const UNREGISTERED: &str = "Unregistered";
    /// Spec does not decode
    pub const INVALID_SPEC: &str = "InvalidSpec";
    /// All checks passed
    pub const VALIDATED: &str = "Validated";
}

/// Check a session request, returning the registration it belongs to
pub fn validate<'a>(
    request: &SessionSpec,
    registrations: &'a [ActiveRegistration],
) -> Result<&'a ActiveRegistration, (&'static str, String)> {
    let requests = request
        .network_configuration
        .as_ref()
        .map_or(0, |n| n.requests.len());
    if requests == 0 {
        return Err((
            reason::NETWORK_CONFIGURATION_NOT_SPECIFIED,
            "networkConfiguration.requests is empty".into(),
        ));
    }
    let (flows, rules) = request
        .qos
        .as_ref()
        .map_or((0, 0), |q| (q.flows.len(), q.rules.len()));
    if flows == 0 {
        return Err((reason::QOS_FLOWS_NOT_SPECIFIED, "qos.flows is empty".into()));
    }
    if rules == 0 {
        return Err((reason::QOS_RULES_NOT_SPECIFIED, "qos.rules is empty".into()));
    }
    let guti = match request.guti.as_deref() {
        Some(g) if !g.is_empty() => g,
        _ => return Err((reason::GUTI_NOT_SPECIFIED, "guti is required".into())),
    };
    let nssai = request.nssai.as_deref().unwrap_or_default();
    if nssai != SUPPORTED_SLICE {
        return Err((
            reason::NSSAI_NOT_PERMITTED,
            format!("slice {nssai:?} is not permitted"),
        ));
    }
    registrations
        .iter()
        .find(|r| r.guti == guti)
        .ok_or_else(|| (reason::UNREGISTERED, format!("{guti} is not registered")))
}

/// Validate the Session and keep its SessionContext in step with it
pub fn session_input() -> ControlLoop {
    let registrations_key = ObjectKey::cluster(Kind::ActiveRegistrationTable, ACTIVE_REGISTRATIONS);
    ControlLoop::new(
        "session-input",
        Target::Kind(Kind::Session),
        |inputs: &Inputs| {
            let context_key = inputs.target.with_kind(Kind::SessionContext);
            let Some(session) = &inputs.primary else {
                return Ok(vec![Write::Delete(context_key)]);
            };
            let existing = inputs.one(Kind::SessionContext);
            let registrations: Vec<ActiveRegistration> =
                rows(inputs.one(Kind::ActiveRegistrationTable))?;

            let decoded = session.spec_as::<SessionSpec>();
            let verdict = match &decoded {
                Ok(request) => validate(request, &registrations).cloned(),
                Err(e) => Err((reason::INVALID_SPEC, e.to_string())),
            };
            let mut next_spec = SessionContextSpec {
                session: decoded.unwrap_or_default(),
                ..SessionContextSpec::default()
            };
            // idle belongs to the context release toggle once the context exists
            if let Some(existing) = existing {
                next_spec.session.idle = spec::<SessionContextSpec>(existing)?.session.idle;
            }

            let mut context = edit(existing, &context_key);
            let mut current: SessionContextStatus = status(&context)?;
            match verdict {
                Ok(registration) => {
                    next_spec.supi = registration.supi;
                    next_spec.suci = Some(registration.suci);
                    set_condition(
                        &mut current.conditions,
                        Condition::new(VALIDATED, ConditionStatus::True, reason::VALIDATED),
                    );
                }
                Err((why, message)) => set_condition(
                    &mut current.conditions,
                    Condition::new(VALIDATED, ConditionStatus::False, why).with_message(message),
                ),
            }
            refresh_session_ready(&mut current.conditions);
            context.set_spec(&next_spec)?;
            context.set_status(&current)?;
            Ok(vec![Write::Apply(context)])
        },
    )
    .with_predicate(Predicate::GenerationChanged)
    .with_input(
        Input::new(Kind::SessionContext, Join::SameKey).with_predicate(Predicate::GenerationChanged),
    )
    .with_input(Input::new(
        Kind::ActiveRegistrationTable,
        Join::Singleton(registrations_key),
    ))
}

/// Project the SessionContext outcome onto the Session
pub fn session_output() -> ControlLoop {
    ControlLoop::new(
        "session-output",
        Target::Kind(Kind::Session),
        |inputs: &Inputs| {
            let (Some(session), Some(context)) = (&inputs.primary, inputs.one(Kind::SessionContext))
            else {
                return Ok(vec![]);
            };
            let internal: SessionContextStatus = status(context)?;
            let mut projected: SessionStatus = status(session)?;
            for step in SESSION_STEPS {
                match find(&internal.conditions, step) {
                    Some(c) => set_condition(&mut projected.conditions, c.clone()),
                    None => remove_condition(&mut projected.conditions, step),
                }
            }
            refresh_session_ready(&mut projected.conditions);
            projected.network_configuration = internal.network_configuration;
            projected.qos = internal.qos;

            let mut next = session.clone();
            next.set_status(&projected)?;
            Ok(vec![Write::Apply(next)])
        },
    )
    .with_predicate(Predicate::GenerationChanged)
    .with_input(Input::new(Kind::SessionContext, Join::SameKey))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fivegc_core::conditions::status_of;
    use fivegc_core::resources::condition::READY;
    use fivegc_core::Object;
    use serde_json::{json, Value};

    fn request(guti: &str) -> Value {
        json!({
            "guti": guti,
            "nssai": "eMBB",
            "sessionId": 5,
            "pduSessionType": "IPv4",
            "networkConfiguration": {"requests": [{"type": "IPConfiguration", "addressFamily": "IPv4"}]},
            "qos": {
                "flows": [{"name": "best-effort-flow", "fiveQI": "BestEffort"}],
                "rules": [{"name": "default-rule", "qosFlow": "best-effort-flow", "default": true}]
            }
        })
    }

    fn session(spec: Value) -> Object {
        let mut obj = Object::new(&ObjectKey::new(Kind::Session, "guti-a", "s1"));
        obj.spec = spec;
        obj
    }

    fn table() -> Object {
        let mut obj = Object::new(&ObjectKey::cluster(
            Kind::ActiveRegistrationTable,
            ACTIVE_REGISTRATIONS,
        ));
        obj.spec = json!([{
            "name": "reg", "namespace": "default", "guti": "guti-a",
            "suci": "suci-a", "supi": "imsi-a"
        }]);
        obj
    }

    fn context_for(session: &Object, existing: Option<Object>) -> Object {
        let inputs = Inputs::new(session.key())
            .with_primary(Some(session.clone()))
            .with_one(Kind::SessionContext, existing)
            .with_one(Kind::ActiveRegistrationTable, Some(table()));
        match session_input().reconcile(&inputs).unwrap().as_slice() {
            [Write::Apply(ctx)] => ctx.clone(),
            other => panic!("unexpected writes {other:?}"),
        }
    }

    #[test]
    fn registered_guti_resolves_identities() {
        let ctx = context_for(&session(request("guti-a")), None);
        let spec: SessionContextSpec = ctx.spec_as().unwrap();
        assert_eq!(spec.supi.as_deref(), Some("imsi-a"));
        assert_eq!(spec.suci.as_deref(), Some("suci-a"));
        assert_eq!(status_of(&ctx.conditions(), VALIDATED), ConditionStatus::True);
        assert_eq!(status_of(&ctx.conditions(), READY), ConditionStatus::Unknown);
    }

    #[test]
    fn validation_reasons_follow_check_order() {
        let cases = [
            (json!({"networkConfiguration": {"requests": []}}), reason::NETWORK_CONFIGURATION_NOT_SPECIFIED),
            (json!({"qos": {"flows": []}}), reason::QOS_FLOWS_NOT_SPECIFIED),
            (json!({"qos": {"rules": []}}), reason::QOS_RULES_NOT_SPECIFIED),
            (json!({"guti": null}), reason::GUTI_NOT_SPECIFIED),
            (json!({"nssai": "URLLC"}), reason::NSSAI_NOT_PERMITTED),
            (json!({"guti": "guti-unknown"}), reason::UNREGISTERED),
        ];
        for (overlay, expected) in cases {
            let mut spec = request("guti-a");
            fivegc_core::patch::merge_patch(&mut spec, &overlay);
            let ctx = context_for(&session(spec), None);
            let validated = find(&ctx.conditions(), VALIDATED).cloned().unwrap();
            assert_eq!(validated.status, ConditionStatus::False, "{expected}");
            assert_eq!(validated.reason, expected);
            assert_eq!(status_of(&ctx.conditions(), READY), ConditionStatus::False);
        }
    }

    #[test]
    fn idle_flag_is_preserved_once_the_context_exists() {
        let s = session(request("guti-a"));
        let mut ctx = context_for(&s, None);
        ctx.spec["idle"] = json!(true);
        ctx.metadata.resource_version = 3;
        let again = context_for(&s, Some(ctx));
        assert_eq!(again.spec["idle"], json!(true));
        assert_eq!(again.metadata.resource_version, 3);
    }

    #[test]
    fn output_projects_conditions_and_allocations() {
        let s = session(request("guti-a"));
        let mut ctx = Object::new(&s.key().with_kind(Kind::SessionContext));
        ctx.status = Some(json!({
            "conditions": [
                Condition::new(VALIDATED, ConditionStatus::True, "Validated"),
                Condition::new("PolicyApplied", ConditionStatus::True, "PolicyApplied"),
                Condition::new("UPFConfigured", ConditionStatus::False, "Idle"),
            ],
            "networkConfiguration": {"ipConfiguration": {
                "ipAddress": "10.45.0.7", "defaultGateway": "10.45.0.1", "prefixLength": 24
            }}
        }));
        let inputs = Inputs::new(s.key())
            .with_primary(Some(s))
            .with_one(Kind::SessionContext, Some(ctx));
        let writes = session_output().reconcile(&inputs).unwrap();
        let [Write::Apply(out)] = writes.as_slice() else {
            panic!("unexpected writes {writes:?}");
        };
        let projected: SessionStatus = out.status_as().unwrap();
        assert_eq!(status_of(&projected.conditions, "UPFConfigured"), ConditionStatus::False);
        assert_eq!(status_of(&projected.conditions, READY), ConditionStatus::False);
        assert_eq!(
            projected
                .network_configuration
                .and_then(|n| n.ip_configuration)
                .map(|ip| ip.ip_address),
            Some("10.45.0.7".to_string())
        );
    }

    #[test]
    fn deleted_session_cascades() {
        let key = ObjectKey::new(Kind::Session, "guti-a", "s1");
        let writes = session_input().reconcile(&Inputs::new(key.clone())).unwrap();
        assert_eq!(writes, vec![Write::Delete(key.with_kind(Kind::SessionContext))]);
    }
}
