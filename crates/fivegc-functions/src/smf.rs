//! SMF: policy merge, address assignment, UPF notification and the active
//! session table.
//!
//! `spec.idle` on a SessionContext is the whole idle/active toggle: it flips
//! `UPFConfigured` and nothing else, so the addresses and QoS granted while
//! active survive an idle period unchanged.

use crate::ipam::IpPool;
use crate::pcf::{lookup, PolicyLookup};
use crate::support::{edit, rebuild, spec, status};
use fivegc_core::conditions::{aggregate, set_condition, status_of};
use fivegc_core::resources::amf::{NetworkRequest, QosSpec};
use fivegc_core::resources::condition::{POLICY_APPLIED, READY, UPF_CONFIGURED, VALIDATED};
use fivegc_core::resources::pcf::{SlicePolicy, POLICIES};
use fivegc_core::resources::smf::{
    ActiveSession, IpConfiguration, NetworkConfiguration, SessionContextSpec, SessionContextStatus,
    ACTIVE_SESSIONS,
};
use fivegc_core::resources::upf::UpfConfigSpec;
use fivegc_core::resources::DnsConfiguration;
use fivegc_core::{Condition, ConditionStatus, Kind, Object, ObjectKey};
use fivegc_runtime::{ControlLoop, Input, Inputs, Join, Predicate, Target, TransformError, Write};
use std::sync::Arc;

/// Conditions that make up session readiness
pub const SESSION_STEPS: [&str; 3] = [VALIDATED, POLICY_APPLIED, UPF_CONFIGURED];

/// Condition reasons
pub mod reason {
    /// Validation has not passed
    pub const NOT_VALIDATED: &str = "NotValidated";
    /// Policy table not loaded yet
    pub const POLICY_PENDING: &str = "PolicyPending";
    /// No policy for the slice
    pub const POLICY_NOT_FOUND: &str = "PolicyNotFound";
    /// PDU session type not allowed on the slice
    pub const ADDRESS_FAMILY_NOT_SUPPORTED: &str = "AddressFamilyNotSupported";
    /// Policy merged
    pub const POLICY_APPLIED: &str = "PolicyApplied";
    /// Waiting for policy
    pub const POLICY_NOT_APPLIED: &str = "PolicyNotApplied";
    /// User plane provisioned
    pub const UPF_CONFIGURED: &str = "UPFConfigured";
    /// Session released to idle
    pub const IDLE: &str = "Idle";
    /// All steps True
    pub const SESSION_READY: &str = "SessionReady";
    /// Some step False
    pub const SESSION_NOT_READY: &str = "SessionNotReady";
    /// Still in flight
    pub const SESSION_PENDING: &str = "SessionPending";
}

/// Recompute `Ready` from [`SESSION_STEPS`]
pub fn refresh_ready(conditions: &mut Vec<Condition>) {
    let (state, why) = match aggregate(conditions, &SESSION_STEPS) {
        ConditionStatus::True => (ConditionStatus::True, reason::SESSION_READY),
        ConditionStatus::False => (ConditionStatus::False, reason::SESSION_NOT_READY),
        ConditionStatus::Unknown => (ConditionStatus::Unknown, reason::SESSION_PENDING),
    };
    set_condition(conditions, Condition::new(READY, state, why));
}

/// Keep requested flows the policy allows, capped to the policy limits, and
/// the rules that still reference a kept flow
pub fn apply_policy(requested: &QosSpec, policy: &SlicePolicy) -> QosSpec {
    let flows: Vec<_> = requested
        .flows
        .iter()
        .filter_map(|flow| {
            let limit = policy.qos_for(&flow.five_qi)?;
            let mut flow = flow.clone();
            if let (Some(rates), Some(max)) = (flow.bit_rates, limit.max_bit_rates) {
                flow.bit_rates = Some(rates.capped(max));
            }
            Some(flow)
        })
        .collect();
    let rules = requested
        .rules
        .iter()
        .filter(|rule| flows.iter().any(|f| f.name == rule.qos_flow))
        .cloned()
        .collect();
    QosSpec { flows, rules }
}

/// Address and resolver assignment
#[derive(Debug, Clone)]
pub struct Addressing {
    pool: IpPool,
    fallback_dns: DnsConfiguration,
}

impl Addressing {
    /// Assign from `pool`, using `fallback_dns` for slices without resolvers
    pub fn new(pool: IpPool, fallback_dns: DnsConfiguration) -> Self {
        Self { pool, fallback_dns }
    }

    /// Grant what was requested. An address already granted to `owner` is
    /// kept as long as it is still a host of the pool.
    pub fn grant(
        &self,
        owner: &ObjectKey,
        requests: &[NetworkRequest],
        policy: &SlicePolicy,
        current: Option<&NetworkConfiguration>,
    ) -> Option<NetworkConfiguration> {
        let wants = |t: &str| requests.iter().any(|r| r.type_ == t);
        let ip_configuration = wants("IPConfiguration").then(|| {
            current
                .and_then(|c| c.ip_configuration.clone())
                .filter(|ip| ip.ip_address.parse::<std::net::Ipv4Addr>().is_ok_and(|a| self.pool.is_host(a)))
                .unwrap_or_else(|| IpConfiguration {
                    ip_address: self
                        .pool
                        .address_for(&format!("{}/{}", owner.namespace, owner.name))
                        .to_string(),
                    default_gateway: self.pool.gateway().to_string(),
                    prefix_length: self.pool.prefix_length(),
                })
        });
        let dns_configuration = wants("DNSServer").then(|| {
            if policy.dns.primary_dns.is_empty() {
                self.fallback_dns.clone()
            } else {
                policy.dns.clone()
            }
        });
        if ip_configuration.is_none() && dns_configuration.is_none() {
            return None;
        }
        Some(NetworkConfiguration {
            ip_configuration,
            dns_configuration,
        })
    }
}

impl Default for Addressing {
    fn default() -> Self {
        Self::new(
            IpPool::default(),
            DnsConfiguration {
                primary_dns: "8.8.8.8".into(),
                secondary_dns: "8.8.4.4".into(),
            },
        )
    }
}

fn withdraw(current: &mut SessionContextStatus, policy: Condition, upf_reason: &str) {
    set_condition(&mut current.conditions, policy);
    set_condition(
        &mut current.conditions,
        Condition::new(UPF_CONFIGURED, ConditionStatus::Unknown, upf_reason),
    );
    current.qos = None;
    current.network_configuration = None;
}

/// Evaluate one SessionContext against the policy table
pub fn handle_session_context(
    context: &Object,
    policies: Option<&Object>,
    addressing: &Addressing,
) -> Result<SessionContextStatus, TransformError> {
    let request: SessionContextSpec = spec(context)?;
    let mut current: SessionContextStatus = status(context)?;

    if status_of(&current.conditions, VALIDATED) != ConditionStatus::True {
        withdraw(
            &mut current,
            Condition::new(POLICY_APPLIED, ConditionStatus::Unknown, reason::NOT_VALIDATED),
            reason::NOT_VALIDATED,
        );
        refresh_ready(&mut current.conditions);
        return Ok(current);
    }

    let nssai = request.session.nssai.as_deref().unwrap_or_default();
    let refused = |why: &str, message: String| {
        Condition::new(POLICY_APPLIED, ConditionStatus::False, why).with_message(message)
    };
    match lookup(policies, nssai)? {
        PolicyLookup::Pending => withdraw(
            &mut current,
            Condition::new(POLICY_APPLIED, ConditionStatus::Unknown, reason::POLICY_PENDING),
            reason::POLICY_NOT_APPLIED,
        ),
        PolicyLookup::NotFound => withdraw(
            &mut current,
            refused(reason::POLICY_NOT_FOUND, format!("no policy for slice {nssai:?}")),
            reason::POLICY_NOT_APPLIED,
        ),
        PolicyLookup::Found(policy)
            if !policy.allows_pdu_type(request.session.pdu_session_type.as_deref()) =>
        {
            withdraw(
                &mut current,
                refused(
                    reason::ADDRESS_FAMILY_NOT_SUPPORTED,
                    format!(
                        "PDU session type {} not allowed on {nssai}",
                        request.session.pdu_session_type.as_deref().unwrap_or("IPv4")
                    ),
                ),
                reason::POLICY_NOT_APPLIED,
            );
        }
        PolicyLookup::Found(policy) => {
            set_condition(
                &mut current.conditions,
                Condition::new(POLICY_APPLIED, ConditionStatus::True, reason::POLICY_APPLIED),
            );
            current.qos = Some(apply_policy(
                &request.session.qos.clone().unwrap_or_default(),
                &policy,
            ));
            let requests = request
                .session
                .network_configuration
                .as_ref()
                .map(|n| n.requests.as_slice())
                .unwrap_or_default();
            current.network_configuration = addressing.grant(
                &context.key(),
                requests,
                &policy,
                current.network_configuration.as_ref(),
            );
            let upf = if request.session.idle == Some(true) {
                Condition::new(UPF_CONFIGURED, ConditionStatus::False, reason::IDLE)
            } else {
                Condition::new(UPF_CONFIGURED, ConditionStatus::True, reason::UPF_CONFIGURED)
            };
            set_condition(&mut current.conditions, upf);
        }
    }
    refresh_ready(&mut current.conditions);
    Ok(current)
}

/// Merge policy, grant addresses and derive `UPFConfigured`
pub fn session_context_handler(addressing: Arc<Addressing>) -> ControlLoop {
    let policies = ObjectKey::cluster(Kind::PolicyTable, POLICIES);
    ControlLoop::new(
        "session-context-handler",
        Target::Kind(Kind::SessionContext),
        move |inputs: &Inputs| {
            let Some(context) = &inputs.primary else {
                return Ok(vec![]);
            };
            let next_status =
                handle_session_context(context, inputs.one(Kind::PolicyTable), &addressing)?;
            let mut next = context.clone();
            next.set_status(&next_status)?;
            Ok(vec![Write::Apply(next)])
        },
    )
    .with_input(Input::new(Kind::PolicyTable, Join::Singleton(policies)))
}

/// Mirror ready sessions into UPF Configs; withdraw the Config otherwise
pub fn upf_notifier() -> ControlLoop {
    ControlLoop::new(
        "upf-notifier",
        Target::Kind(Kind::SessionContext),
        |inputs: &Inputs| {
            let config_key = inputs.target.with_kind(Kind::UpfConfig);
            let Some(context) = &inputs.primary else {
                return Ok(vec![Write::Delete(config_key)]);
            };
            if status_of(&context.conditions(), READY) != ConditionStatus::True {
                return Ok(vec![Write::Delete(config_key)]);
            }
            let request: SessionContextSpec = spec(context)?;
            let granted: SessionContextStatus = status(context)?;
            let mut config = edit(inputs.one(Kind::UpfConfig), &config_key);
            config.set_spec(&UpfConfigSpec {
                guti: request.session.guti.unwrap_or_default(),
                session_id: request.session.session_id.unwrap_or_default(),
                network_configuration: granted.network_configuration.unwrap_or_default(),
                qos: granted.qos.unwrap_or_default(),
            })?;
            Ok(vec![Write::Apply(config)])
        },
    )
    .with_predicate(Predicate::condition_true(READY))
    .with_input(Input::new(Kind::UpfConfig, Join::SameKey).with_predicate(Predicate::GenerationChanged))
}

/// Rows for every SessionContext that passed validation and policy
pub fn active_sessions(contexts: &[Object]) -> Result<Vec<ActiveSession>, TransformError> {
    let mut rows = Vec::new();
    for context in contexts {
        let conditions = context.conditions();
        if status_of(&conditions, VALIDATED) != ConditionStatus::True
            || status_of(&conditions, POLICY_APPLIED) != ConditionStatus::True
        {
            continue;
        }
        let request: SessionContextSpec = spec(context)?;
        rows.push(ActiveSession {
            name: context.name().to_string(),
            namespace: context.namespace().to_string(),
            guti: request.session.guti.unwrap_or_default(),
            session_id: request.session.session_id.unwrap_or_default(),
            idle: request.session.idle == Some(true),
        });
    }
    rows.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    Ok(rows)
}

/// Maintain the ActiveSessionTable singleton
pub fn active_session() -> ControlLoop {
    let table = ObjectKey::cluster(Kind::ActiveSessionTable, ACTIVE_SESSIONS);
    ControlLoop::new("active-session", Target::Singleton(table), |inputs: &Inputs| {
        let rows = active_sessions(inputs.many(Kind::SessionContext))?;
        rebuild(inputs.primary.as_ref(), &inputs.target, &rows)
    })
    .with_input(
        Input::new(Kind::SessionContext, Join::Members)
            .with_predicate(Predicate::condition_true(POLICY_APPLIED)),
    )
}

/// Every SMF loop
pub fn control_loops(addressing: Arc<Addressing>) -> Vec<ControlLoop> {
    vec![
        session_context_handler(addressing),
        upf_notifier(),
        active_session(),
    ]
}
