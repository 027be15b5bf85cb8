//! SMF resources.

use super::amf::{QosSpec, SessionSpec};
use super::DnsConfiguration;
use crate::conditions::Condition;
use serde::{Deserialize, Serialize};

/// Name of the active session table singleton
pub const ACTIVE_SESSIONS: &str = "active-sessions";

/// SessionContext spec: the session request plus resolved identities
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionContextSpec {
    /// Copied from the Session, except `idle`
    #[serde(flatten)]
    pub session: SessionSpec,
    /// Resolved permanent identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
    /// Concealed identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suci: Option<String>,
}

/// Allocated address
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    /// UE address
    pub ip_address: String,
    /// Pool gateway
    pub default_gateway: String,
    /// Pool prefix length
    pub prefix_length: u8,
}

/// Granted network configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    /// Present when an `IPConfiguration` was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_configuration: Option<IpConfiguration>,
    /// Present when a `DNSServer` was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_configuration: Option<DnsConfiguration>,
}

/// SessionContext status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContextStatus {
    /// Validated, PolicyApplied, UPFConfigured and Ready
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Policy-filtered QoS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos: Option<QosSpec>,
    /// Allocated addressing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfiguration>,
}

/// Entry of the active session table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    /// SessionContext name
    pub name: String,
    /// SessionContext namespace
    pub namespace: String,
    /// Owning UE's temporary identity
    pub guti: String,
    /// PDU session id
    #[serde(default)]
    pub session_id: i64,
    /// Whether the session is idle
    #[serde(default)]
    pub idle: bool,
}
