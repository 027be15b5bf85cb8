//! Registration pipeline.
//!
//! ```text
//! Registration --register-input--> RegState --identity-req--> MobileIdentity (AUSF)
//!                                     ^  <------identity-handler-----'
//!                                     |  --config-req--> Config (UDM, named by GUTI)
//!                                     '  <--config-handler--'
//! RegState --register-output--> Registration.status
//! RegState* --active-registration--> ActiveRegistrationTable
//! ```
//!
//! RegState carries the in-flight conditions; the Registration only receives a
//! status once the outcome is settled.

use crate::identity::guti_for;
use crate::support::{edit, rebuild, spec, status};
use fivegc_core::conditions::{aggregate, find, remove_condition, set_condition, status_of};
use fivegc_core::resources::amf::{ActiveRegistration, RegistrationSpec, RegistrationStatus, ACTIVE_REGISTRATIONS};
use fivegc_core::resources::ausf::{MobileIdentitySpec, MobileIdentityStatus};
use fivegc_core::resources::condition::{AUTHENTICATED, READY, SUBSCRIPTION_INFO_RETRIEVED, VALIDATED};
use fivegc_core::resources::udm::{UdmConfigSpec, UdmConfigStatus};
use fivegc_core::resources::{Nssai, ObjectRef};
use fivegc_core::{Condition, ConditionStatus, Kind, Object, ObjectKey, STATE_LABEL};
use fivegc_runtime::{ControlLoop, Input, Inputs, Join, Predicate, Target, TransformError, Write};

use super::SUPPORTED_SLICE;

/// Condition reasons
pub mod reason {
    /// `registrationType` is not `initial`
    pub const INVALID_TYPE: &str = "InvalidType";
    /// The UE does not speak 5G NAS
    pub const STANDARD_NOT_SUPPORTED: &str = "StandardNotSupported";
    /// No usable SUCI
    pub const SUCI_NOT_FOUND: &str = "SuciNotFound";
    /// `5G-EA2`/`5G-IA2` missing (spelling is part of the wire contract)
    pub const ENCRYPTION_NOT_SUPPORTED: &str = "EncyptionNotSupported";
    /// Spec does not decode
    pub const INVALID_SPEC: &str = "InvalidSpec";
    /// All checks passed
    pub const VALIDATED: &str = "Validated";
    /// AUSF could not resolve the SUCI
    pub const SUPI_NOT_FOUND: &str = "SupiNotFound";
    /// SUPI resolved and GUTI assigned
    pub const AUTHENTICATED: &str = "Authenticated";
    /// UDM minted a credential
    pub const CONFIG_READY: &str = "ConfigReady";
    /// UDM failed
    pub const CONFIG_NOT_FOUND: &str = "ConfigNotFound";
    /// Every step succeeded
    pub const REGISTRATION_SUCCESSFUL: &str = "RegistrationSuccessful";
    /// Some step failed
    pub const REGISTRATION_FAILED: &str = "RegistrationFailed";
    /// Still in flight
    pub const REGISTRATION_PENDING: &str = "RegistrationPending";
}

/// `state` label AUSF puts on a MobileIdentity it has answered
const ANSWERED: &str = "Ready";

const STEPS: [&str; 3] = [VALIDATED, AUTHENTICATED, SUBSCRIPTION_INFO_RETRIEVED];

/// Check a registration request; the error carries a reason and a message
pub fn validate(spec: &RegistrationSpec) -> Result<(), (&'static str, String)> {
    if spec.registration_type != "initial" {
        return Err((
            reason::INVALID_TYPE,
            format!("registration type {:?} is not supported", spec.registration_type),
        ));
    }
    if spec.ue_status.n1_mode != Some(true) {
        return Err((reason::STANDARD_NOT_SUPPORTED, "N1 mode is required".into()));
    }
    match &spec.mobile_identity {
        Some(id) if id.type_ == "SUCI" && !id.value.is_empty() => {}
        _ => return Err((reason::SUCI_NOT_FOUND, "a SUCI mobile identity is required".into())),
    }
    let caps = &spec.ue_security_capability;
    if !caps.encryption_algorithms.iter().any(|a| a == "5G-EA2")
        || !caps.integrity_algorithms.iter().any(|a| a == "5G-IA2")
    {
        return Err((
            reason::ENCRYPTION_NOT_SUPPORTED,
            "5G-EA2 and 5G-IA2 are required".into(),
        ));
    }
    Ok(())
}

/// Requested slices that are served, or the default slice
pub fn allowed_nssai(requested: &[Nssai]) -> Vec<Nssai> {
    let allowed: Vec<Nssai> = requested
        .iter()
        .filter(|n| n.slice_type == SUPPORTED_SLICE)
        .cloned()
        .collect();
    if allowed.is_empty() {
        vec![Nssai {
            slice_type: SUPPORTED_SLICE.to_string(),
            slice_differentiator: Some("000001".to_string()),
        }]
    } else {
        allowed
    }
}

fn refresh_ready(conditions: &mut Vec<Condition>) {
    let (state, why) = match aggregate(conditions, &STEPS) {
        ConditionStatus::True => (ConditionStatus::True, reason::REGISTRATION_SUCCESSFUL),
        ConditionStatus::False => (ConditionStatus::False, reason::REGISTRATION_FAILED),
        ConditionStatus::Unknown => (ConditionStatus::Unknown, reason::REGISTRATION_PENDING),
    };
    set_condition(conditions, Condition::new(READY, state, why));
}

fn suci_of(spec: &RegistrationSpec) -> String {
    spec.mobile_identity
        .as_ref()
        .map(|m| m.value.clone())
        .unwrap_or_default()
}

fn with_status(object: &Object, status: &RegistrationStatus) -> Result<Vec<Write>, TransformError> {
    let mut next = object.clone();
    next.set_status(status)?;
    Ok(vec![Write::Apply(next)])
}

/// The outcome is final: credential retrieved or refused, or an earlier
/// step failed
pub fn settled() -> Predicate {
    Predicate::Any(vec![
        Predicate::condition_known(SUBSCRIPTION_INFO_RETRIEVED),
        Predicate::condition(VALIDATED, ConditionStatus::False),
        Predicate::condition(AUTHENTICATED, ConditionStatus::False),
    ])
}

fn udm_config_key(state: &Object) -> Option<ObjectKey> {
    let guti = state.status.as_ref()?.get("guti")?.as_str()?;
    Some(ObjectKey::new(Kind::UdmConfig, state.namespace(), guti))
}

/// Delete the Config issued under `previous` once the state no longer names it
fn retire_config(namespace: &str, previous: Option<String>, next: Option<&str>) -> Option<Write> {
    let previous = previous?;
    (next != Some(previous.as_str()))
        .then(|| Write::Delete(ObjectKey::new(Kind::UdmConfig, namespace, previous)))
}

/// Validate the Registration and keep RegState in step with it
pub fn register_input() -> ControlLoop {
    ControlLoop::new(
        "register-input",
        Target::Kind(Kind::Registration),
        |inputs: &Inputs| {
            let state_key = inputs.target.with_kind(Kind::RegState);
            let Some(registration) = &inputs.primary else {
                return Ok(vec![Write::Delete(state_key)]);
            };

            let previous_suci = inputs
                .one(Kind::RegState)
                .and_then(|s| s.spec_as::<RegistrationSpec>().ok())
                .map(|request| suci_of(&request));
            let mut state = edit(inputs.one(Kind::RegState), &state_key);
            state.spec = registration.spec.clone();
            let mut current: RegistrationStatus = status(&state)?;
            let issued = current.guti.clone();

            let verdict = match registration.spec_as::<RegistrationSpec>() {
                Ok(request) => validate(&request).map(|()| request),
                Err(e) => Err((reason::INVALID_SPEC, e.to_string())),
            };
            match verdict {
                Ok(request) => {
                    set_condition(
                        &mut current.conditions,
                        Condition::new(VALIDATED, ConditionStatus::True, reason::VALIDATED),
                    );
                    current.allowed_nssai = allowed_nssai(&request.requested_nssai);
                    if previous_suci.as_deref() != Some(suci_of(&request).as_str()) {
                        // new identity: authenticate again, the GUTI is retired on the answer
                        remove_condition(&mut current.conditions, AUTHENTICATED);
                        remove_condition(&mut current.conditions, SUBSCRIPTION_INFO_RETRIEVED);
                        current.config = None;
                    }
                }
                Err((why, message)) => {
                    set_condition(
                        &mut current.conditions,
                        Condition::new(VALIDATED, ConditionStatus::False, why).with_message(message),
                    );
                    remove_condition(&mut current.conditions, AUTHENTICATED);
                    remove_condition(&mut current.conditions, SUBSCRIPTION_INFO_RETRIEVED);
                    current.supi = None;
                    current.guti = None;
                    current.config = None;
                    current.allowed_nssai.clear();
                }
            }
            refresh_ready(&mut current.conditions);
            let stale = retire_config(state.namespace(), issued, current.guti.as_deref());
            state.set_status(&current)?;
            Ok(std::iter::once(Write::Apply(state)).chain(stale).collect())
        },
    )
    .with_predicate(Predicate::GenerationChanged)
    .with_input(Input::new(Kind::RegState, Join::SameKey).with_predicate(Predicate::GenerationChanged))
}

/// Ask AUSF to resolve the SUCI of a validated registration
pub fn register_identity_req() -> ControlLoop {
    ControlLoop::new(
        "register-identity-req",
        Target::Kind(Kind::RegState),
        |inputs: &Inputs| {
            let request_key = inputs.target.with_kind(Kind::MobileIdentity);
            let Some(state) = &inputs.primary else {
                return Ok(vec![Write::Delete(request_key)]);
            };
            if status_of(&state.conditions(), VALIDATED) != ConditionStatus::True {
                return Ok(vec![Write::Delete(request_key)]);
            }
            let registration: RegistrationSpec = spec(state)?;
            let mut request = edit(inputs.one(Kind::MobileIdentity), &request_key);
            request.set_spec(&MobileIdentitySpec {
                suci: suci_of(&registration),
            })?;
            Ok(vec![Write::Apply(request)])
        },
    )
    .with_predicate(Predicate::condition_true(VALIDATED))
    .with_input(
        Input::new(Kind::MobileIdentity, Join::SameKey).with_predicate(Predicate::GenerationChanged),
    )
}

/// Turn the AUSF answer into `Authenticated` and a GUTI
pub fn register_identity_handler() -> ControlLoop {
    ControlLoop::new(
        "register-identity-handler",
        Target::Kind(Kind::RegState),
        |inputs: &Inputs| {
            let (Some(state), Some(identity)) = (&inputs.primary, inputs.one(Kind::MobileIdentity))
            else {
                return Ok(vec![]);
            };
            if status_of(&state.conditions(), VALIDATED) != ConditionStatus::True {
                return Ok(vec![]);
            }
            let registration: RegistrationSpec = spec(state)?;
            let answer: MobileIdentityStatus = status(identity)?;
            if answer.suci != suci_of(&registration) {
                // answer to an earlier request
                return Ok(vec![]);
            }

            let mut current: RegistrationStatus = status(state)?;
            let issued = current.guti.clone();
            match (status_of(&answer.conditions, READY), answer.supi) {
                (ConditionStatus::True, Some(supi)) => {
                    let guti = guti_for(&supi);
                    if current.guti.as_deref() != Some(guti.as_str()) {
                        remove_condition(&mut current.conditions, SUBSCRIPTION_INFO_RETRIEVED);
                        current.config = None;
                    }
                    set_condition(
                        &mut current.conditions,
                        Condition::new(AUTHENTICATED, ConditionStatus::True, reason::AUTHENTICATED),
                    );
                    current.supi = Some(supi);
                    current.guti = Some(guti);
                }
                (ConditionStatus::Unknown, _) => return Ok(vec![]),
                _ => {
                    set_condition(
                        &mut current.conditions,
                        Condition::new(AUTHENTICATED, ConditionStatus::False, reason::SUPI_NOT_FOUND)
                            .with_message(format!("no subscriber for {}", answer.suci)),
                    );
                    remove_condition(&mut current.conditions, SUBSCRIPTION_INFO_RETRIEVED);
                    current.supi = None;
                    current.guti = None;
                    current.config = None;
                }
            }
            refresh_ready(&mut current.conditions);
            let mut writes = with_status(state, &current)?;
            writes.extend(retire_config(state.namespace(), issued, current.guti.as_deref()));
            Ok(writes)
        },
    )
    .with_predicate(Predicate::condition_true(VALIDATED))
    .with_input(
        Input::new(Kind::MobileIdentity, Join::SameKey)
            .with_predicate(Predicate::label(STATE_LABEL, ANSWERED)),
    )
}

/// Ask UDM for the credential of an authenticated registration
pub fn register_config_req() -> ControlLoop {
    ControlLoop::new(
        "register-config-req",
        Target::Kind(Kind::RegState),
        |inputs: &Inputs| {
            let Some(state) = &inputs.primary else {
                let stale = inputs.tombstone.as_ref().and_then(udm_config_key);
                return Ok(stale.map(Write::Delete).into_iter().collect());
            };
            let Some(key) = udm_config_key(state) else {
                return Ok(vec![]);
            };
            if status_of(&state.conditions(), AUTHENTICATED) != ConditionStatus::True {
                return Ok(vec![Write::Delete(key)]);
            }
            let mut request = edit(inputs.one(Kind::UdmConfig), &key);
            request.set_spec(&UdmConfigSpec {
                guti: key.name.clone(),
                registration: Some(ObjectRef::new(state.namespace(), state.name())),
            })?;
            Ok(vec![Write::Apply(request)])
        },
    )
    .with_predicate(Predicate::condition_true(AUTHENTICATED))
    .with_input(
        Input::new(Kind::UdmConfig, Join::ForeignKey(udm_config_key))
            .with_predicate(Predicate::GenerationChanged),
    )
}

/// Copy the UDM answer into `SubscriptionInfoRetrieved` and the status
pub fn register_config_handler() -> ControlLoop {
    ControlLoop::new(
        "register-config-handler",
        Target::Kind(Kind::RegState),
        |inputs: &Inputs| {
            let (Some(state), Some(config)) = (&inputs.primary, inputs.one(Kind::UdmConfig)) else {
                return Ok(vec![]);
            };
            if status_of(&state.conditions(), AUTHENTICATED) != ConditionStatus::True {
                return Ok(vec![]);
            }
            let answer: UdmConfigStatus = status(config)?;
            let mut current: RegistrationStatus = status(state)?;
            match status_of(&answer.conditions, READY) {
                ConditionStatus::True => {
                    set_condition(
                        &mut current.conditions,
                        Condition::new(
                            SUBSCRIPTION_INFO_RETRIEVED,
                            ConditionStatus::True,
                            reason::CONFIG_READY,
                        ),
                    );
                    current.config = answer.config;
                }
                ConditionStatus::False => {
                    let message = find(&answer.conditions, READY)
                        .map(|c| c.message.clone())
                        .unwrap_or_default();
                    set_condition(
                        &mut current.conditions,
                        Condition::new(
                            SUBSCRIPTION_INFO_RETRIEVED,
                            ConditionStatus::False,
                            reason::CONFIG_NOT_FOUND,
                        )
                        .with_message(message),
                    );
                    current.config = None;
                }
                ConditionStatus::Unknown => return Ok(vec![]),
            }
            refresh_ready(&mut current.conditions);
            with_status(state, &current)
        },
    )
    .with_predicate(Predicate::condition_true(AUTHENTICATED))
    .with_input(
        Input::new(Kind::UdmConfig, Join::ForeignKey(udm_config_key))
            .with_predicate(Predicate::condition_known(READY)),
    )
}

/// Project a settled RegState onto the user-facing Registration; a
/// Registration already showing an outcome turns pending while it is redone
pub fn register_output() -> ControlLoop {
    ControlLoop::new(
        "register-output",
        Target::Kind(Kind::Registration),
        |inputs: &Inputs| {
            let (Some(registration), Some(state)) = (&inputs.primary, inputs.one(Kind::RegState))
            else {
                return Ok(vec![]);
            };
            let internal: RegistrationStatus = status(state)?;
            let mut conditions = status::<RegistrationStatus>(registration)?.conditions;
            for step in STEPS {
                match find(&internal.conditions, step) {
                    Some(c) => set_condition(&mut conditions, c.clone()),
                    None => remove_condition(&mut conditions, step),
                }
            }
            if !settled().matches(state) || state.spec != registration.spec {
                // first outcome not reached yet: leave the status empty
                if !status_of(&conditions, READY).is_known() {
                    return Ok(vec![]);
                }
                set_condition(
                    &mut conditions,
                    Condition::new(READY, ConditionStatus::Unknown, reason::REGISTRATION_PENDING)
                        .with_message("re-registration in progress"),
                );
                let pending = RegistrationStatus {
                    conditions,
                    ..RegistrationStatus::default()
                };
                return with_status(registration, &pending);
            }
            let ready = if aggregate(&conditions, &STEPS) == ConditionStatus::True {
                Condition::new(READY, ConditionStatus::True, reason::REGISTRATION_SUCCESSFUL)
            } else {
                Condition::new(READY, ConditionStatus::False, reason::REGISTRATION_FAILED)
            };
            set_condition(&mut conditions, ready);

            let projected = RegistrationStatus {
                conditions,
                supi: None,
                guti: internal.guti,
                allowed_nssai: internal.allowed_nssai,
                config: internal.config,
            };
            with_status(registration, &projected)
        },
    )
    .with_predicate(Predicate::GenerationChanged)
    .with_input(Input::new(Kind::RegState, Join::SameKey).with_predicate(settled()))
}

/// Rows for every RegState whose registration succeeded
pub fn active_registrations(states: &[Object]) -> Result<Vec<ActiveRegistration>, TransformError> {
    let mut rows = Vec::new();
    for state in states {
        if status_of(&state.conditions(), READY) != ConditionStatus::True {
            continue;
        }
        let current: RegistrationStatus = status(state)?;
        let Some(guti) = current.guti else { continue };
        let request: RegistrationSpec = spec(state)?;
        rows.push(ActiveRegistration {
            name: state.name().to_string(),
            namespace: state.namespace().to_string(),
            guti,
            suci: suci_of(&request),
            supi: current.supi,
        });
    }
    rows.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    Ok(rows)
}

/// Maintain the ActiveRegistrationTable singleton
pub fn active_registration() -> ControlLoop {
    let table = ObjectKey::cluster(Kind::ActiveRegistrationTable, ACTIVE_REGISTRATIONS);
    ControlLoop::new("active-registration", Target::Singleton(table), |inputs: &Inputs| {
        let rows = active_registrations(inputs.many(Kind::RegState))?;
        rebuild(inputs.primary.as_ref(), &inputs.target, &rows)
    })
    .with_input(
        Input::new(Kind::RegState, Join::Members).with_predicate(Predicate::condition_true(READY)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fivegc_core::conditions::status_of;
    use serde_json::{json, Value};

    fn request() -> Value {
        json!({
            "registrationType": "initial",
            "mobileIdentity": {"type": "SUCI", "value": "suci-0-999-01-02-4f2a7b9c8d13e7a5c0"},
            "ueSecurityCapability": {
                "encryptionAlgorithms": ["5G-EA0", "5G-EA1", "5G-EA2", "5G-EA3"],
                "integrityAlgorithms": ["5G-IA0", "5G-IA1", "5G-IA2", "5G-IA3"]
            },
            "ueStatus": {"n1Mode": true},
            "requestedNSSAI": [
                {"sliceType": "eMBB", "sliceDifferentiator": "000001"},
                {"sliceType": "URLLC", "sliceDifferentiator": "000002"}
            ]
        })
    }

    fn registration(spec: Value) -> Object {
        let mut obj = Object::new(&ObjectKey::new(Kind::Registration, "default", "reg"));
        obj.spec = spec;
        obj.metadata.generation = 1;
        obj
    }

    fn run(control_loop: &ControlLoop, inputs: Inputs) -> Vec<Write> {
        control_loop.reconcile(&inputs).unwrap()
    }

    fn applied(writes: Vec<Write>) -> Object {
        match writes.as_slice() {
            [Write::Apply(obj)] => obj.clone(),
            other => panic!("expected one apply, got {other:?}"),
        }
    }

    fn input_for(reg: &Object) -> Inputs {
        Inputs::new(reg.key())
            .with_primary(Some(reg.clone()))
            .with_one(Kind::RegState, None)
    }

    #[test]
    fn valid_request_creates_validated_regstate() {
        let reg = registration(request());
        let state = applied(run(&register_input(), input_for(&reg)));
        assert_eq!(state.kind, Kind::RegState);
        assert_eq!(state.spec, reg.spec);
        let conds = state.conditions();
        assert_eq!(status_of(&conds, VALIDATED), ConditionStatus::True);
        assert_eq!(status_of(&conds, READY), ConditionStatus::Unknown);
        let current: RegistrationStatus = state.status_as().unwrap();
        assert_eq!(current.allowed_nssai.len(), 1);
        assert_eq!(current.allowed_nssai[0].slice_type, "eMBB");
    }

    #[test]
    fn validation_reasons_follow_check_order() {
        let cases = [
            (json!({"registrationType": "periodic"}), reason::INVALID_TYPE),
            (json!({"ueStatus": {"n1Mode": false}}), reason::STANDARD_NOT_SUPPORTED),
            (json!({"mobileIdentity": {"type": "SUCI", "value": ""}}), reason::SUCI_NOT_FOUND),
            (
                json!({"ueSecurityCapability": {"encryptionAlgorithms": ["5G-EA0"]}}),
                reason::ENCRYPTION_NOT_SUPPORTED,
            ),
            (json!({"registrationType": 7}), reason::INVALID_SPEC),
        ];
        for (overlay, expected) in cases {
            let mut spec = request();
            fivegc_core::patch::merge_patch(&mut spec, &overlay);
            let state = applied(run(&register_input(), input_for(&registration(spec))));
            let conds = state.conditions();
            let validated = find(&conds, VALIDATED).unwrap();
            assert_eq!(validated.status, ConditionStatus::False);
            assert_eq!(validated.reason, expected);
            assert_eq!(status_of(&conds, READY), ConditionStatus::False);
            assert!(settled().matches(&state));
        }
    }

    #[test]
    fn deleted_registration_cascades_to_regstate() {
        let key = ObjectKey::new(Kind::Registration, "default", "reg");
        let writes = run(&register_input(), Inputs::new(key.clone()));
        assert_eq!(writes, vec![Write::Delete(key.with_kind(Kind::RegState))]);
    }

    fn validated_state() -> Object {
        let reg = registration(request());
        applied(run(&register_input(), input_for(&reg)))
    }

    fn identity_answer(supi: Option<&str>) -> Object {
        let mut obj = Object::new(&ObjectKey::new(Kind::MobileIdentity, "default", "reg"));
        let ready = if supi.is_some() {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        };
        obj.set_status(&MobileIdentityStatus {
            conditions: vec![Condition::new(READY, ready, "x")],
            suci: "suci-0-999-01-02-4f2a7b9c8d13e7a5c0".into(),
            supi: supi.map(String::from),
        })
        .unwrap();
        obj
    }

    #[test]
    fn identity_answer_assigns_guti() {
        let state = validated_state();
        let inputs = Inputs::new(state.key())
            .with_primary(Some(state.clone()))
            .with_one(Kind::MobileIdentity, Some(identity_answer(Some("imsi-999010000000123"))));
        let next = applied(run(&register_identity_handler(), inputs));
        let current: RegistrationStatus = next.status_as().unwrap();
        assert_eq!(current.guti, Some(guti_for("imsi-999010000000123")));
        assert_eq!(status_of(&current.conditions, AUTHENTICATED), ConditionStatus::True);
        assert_eq!(status_of(&current.conditions, READY), ConditionStatus::Unknown);
    }

    #[test]
    fn unresolved_identity_fails_authentication() {
        let state = validated_state();
        let inputs = Inputs::new(state.key())
            .with_primary(Some(state.clone()))
            .with_one(Kind::MobileIdentity, Some(identity_answer(None)));
        let next = applied(run(&register_identity_handler(), inputs));
        let conds = next.conditions();
        assert_eq!(find(&conds, AUTHENTICATED).unwrap().reason, reason::SUPI_NOT_FOUND);
        assert_eq!(status_of(&conds, READY), ConditionStatus::False);
    }

    #[test]
    fn identity_handler_wakes_on_ausf_answers() {
        let handler = register_identity_handler();
        let input = handler
            .inputs
            .iter()
            .find(|i| i.kind == Kind::MobileIdentity)
            .unwrap();
        let asked = Object::new(&ObjectKey::new(Kind::MobileIdentity, "default", "reg"));
        let mut answered = identity_answer(None);
        answered.set_label(STATE_LABEL, "Ready");
        assert!(!input.predicate.admits(&asked, None));
        assert!(input.predicate.admits(&answered, Some(&asked)));
    }

    #[test]
    fn missing_answer_is_pending_not_an_error() {
        let state = validated_state();
        let inputs = Inputs::new(state.key())
            .with_primary(Some(state))
            .with_one(Kind::MobileIdentity, None);
        assert!(run(&register_identity_handler(), inputs).is_empty());
    }

    #[test]
    fn tombstone_deletes_udm_config_by_guti() {
        let mut state = validated_state();
        state.status.as_mut().unwrap()["guti"] = json!("guti-x");
        let inputs = Inputs::new(state.key()).with_tombstone(Some(state));
        let writes = run(&register_config_req(), inputs);
        assert_eq!(
            writes,
            vec![Write::Delete(ObjectKey::new(Kind::UdmConfig, "default", "guti-x"))]
        );
    }

    #[test]
    fn output_waits_for_settled_state() {
        let reg = registration(request());
        let state = validated_state();
        let inputs = Inputs::new(reg.key())
            .with_primary(Some(reg.clone()))
            .with_one(Kind::RegState, Some(state.clone()));
        assert!(run(&register_output(), inputs).is_empty());

        let mut done: RegistrationStatus = state.status_as().unwrap();
        for step in [AUTHENTICATED, SUBSCRIPTION_INFO_RETRIEVED] {
            set_condition(&mut done.conditions, Condition::new(step, ConditionStatus::True, "ok"));
        }
        done.guti = Some("guti-1".into());
        done.supi = Some("imsi-1".into());
        let mut settled_state = state;
        settled_state.set_status(&done).unwrap();
        let inputs = Inputs::new(reg.key())
            .with_primary(Some(reg))
            .with_one(Kind::RegState, Some(settled_state));
        let out = applied(run(&register_output(), inputs));
        let projected: RegistrationStatus = out.status_as().unwrap();
        let ready = find(&projected.conditions, READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.reason, reason::REGISTRATION_SUCCESSFUL);
        assert_eq!(projected.guti.as_deref(), Some("guti-1"));
        assert_eq!(projected.supi, None);
    }

    fn authenticated_state(guti: &str) -> Object {
        let mut state = validated_state();
        let mut current: RegistrationStatus = state.status_as().unwrap();
        for step in [AUTHENTICATED, SUBSCRIPTION_INFO_RETRIEVED] {
            set_condition(&mut current.conditions, Condition::new(step, ConditionStatus::True, "ok"));
        }
        refresh_ready(&mut current.conditions);
        current.guti = Some(guti.into());
        current.supi = Some("imsi-999010000000001".into());
        state.set_status(&current).unwrap();
        state
    }

    #[test]
    fn new_guti_retires_previous_config() {
        let state = authenticated_state("guti-old");
        let inputs = Inputs::new(state.key())
            .with_primary(Some(state))
            .with_one(Kind::MobileIdentity, Some(identity_answer(Some("imsi-999010000000123"))));
        let writes = run(&register_identity_handler(), inputs);
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[1],
            Write::Delete(ObjectKey::new(Kind::UdmConfig, "default", "guti-old"))
        );
        let Write::Apply(next) = &writes[0] else {
            panic!("expected the state first, got {writes:?}");
        };
        let current: RegistrationStatus = next.status_as().unwrap();
        assert_eq!(current.guti, Some(guti_for("imsi-999010000000123")));
        assert_eq!(status_of(&current.conditions, SUBSCRIPTION_INFO_RETRIEVED), ConditionStatus::Unknown);
    }

    #[test]
    fn same_guti_keeps_config() {
        let guti = guti_for("imsi-999010000000123");
        let state = authenticated_state(&guti);
        let inputs = Inputs::new(state.key())
            .with_primary(Some(state))
            .with_one(Kind::MobileIdentity, Some(identity_answer(Some("imsi-999010000000123"))));
        let writes = run(&register_identity_handler(), inputs);
        assert!(writes.iter().all(|w| matches!(w, Write::Apply(_))));
    }

    #[test]
    fn invalid_update_retires_config() {
        let state = authenticated_state("guti-old");
        let mut spec = request();
        spec["registrationType"] = json!("periodic");
        let reg = registration(spec);
        let inputs = Inputs::new(reg.key())
            .with_primary(Some(reg))
            .with_one(Kind::RegState, Some(state));
        let writes = run(&register_input(), inputs);
        assert_eq!(
            writes.last(),
            Some(&Write::Delete(ObjectKey::new(Kind::UdmConfig, "default", "guti-old")))
        );
    }

    #[test]
    fn changed_suci_requires_new_authentication() {
        let state = authenticated_state("guti-old");
        let mut spec = request();
        spec["mobileIdentity"]["value"] = json!("suci-0-999-01-02-000000000000000001");
        let reg = registration(spec);
        let inputs = Inputs::new(reg.key())
            .with_primary(Some(reg))
            .with_one(Kind::RegState, Some(state));
        let next = applied(run(&register_input(), inputs));
        let current: RegistrationStatus = next.status_as().unwrap();
        assert_eq!(status_of(&current.conditions, AUTHENTICATED), ConditionStatus::Unknown);
        assert_eq!(status_of(&current.conditions, READY), ConditionStatus::Unknown);
        assert_eq!(current.guti.as_deref(), Some("guti-old"));
        assert!(!settled().matches(&next));
    }

    #[test]
    fn output_reports_pending_during_reregistration() {
        let mut reg = registration(request());
        reg.set_status(&RegistrationStatus {
            conditions: vec![Condition::new(READY, ConditionStatus::True, reason::REGISTRATION_SUCCESSFUL)],
            guti: Some("guti-old".into()),
            ..RegistrationStatus::default()
        })
        .unwrap();
        let mut state = authenticated_state("guti-new");
        let mut current: RegistrationStatus = state.status_as().unwrap();
        remove_condition(&mut current.conditions, SUBSCRIPTION_INFO_RETRIEVED);
        refresh_ready(&mut current.conditions);
        state.set_status(&current).unwrap();

        let inputs = Inputs::new(reg.key())
            .with_primary(Some(reg))
            .with_one(Kind::RegState, Some(state));
        let out = applied(run(&register_output(), inputs));
        let projected: RegistrationStatus = out.status_as().unwrap();
        let ready = find(&projected.conditions, READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::Unknown);
        assert_eq!(ready.reason, reason::REGISTRATION_PENDING);
        assert_eq!(projected.guti, None);
        assert_eq!(projected.config, None);
    }

    #[test]
    fn table_lists_only_ready_states() {
        let mut ready = validated_state();
        let mut current: RegistrationStatus = ready.status_as().unwrap();
        set_condition(
            &mut current.conditions,
            Condition::new(READY, ConditionStatus::True, "ok"),
        );
        current.guti = Some("guti-a".into());
        ready.set_status(&current).unwrap();
        let pending = validated_state();

        let rows = active_registrations(&[ready, pending]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].guti, "guti-a");
        assert_eq!(rows[0].suci, "suci-0-999-01-02-4f2a7b9c8d13e7a5c0");
    }
}
