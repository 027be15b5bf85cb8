//! AMF resources: Registration, RegState, Session, ContextRelease and the
//! active registration table.

use super::{Nssai, ObjectRef};
use crate::conditions::Condition;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the active registration table singleton
pub const ACTIVE_REGISTRATIONS: &str = "active-registrations";

/// Mobile identity carried in a registration request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MobileIdentityValue {
    /// Identity type, `SUCI` is the only accepted one
    #[serde(rename = "type", default)]
    pub type_: String,
    /// Concealed identifier
    #[serde(default)]
    pub value: String,
}

/// Algorithms the UE supports
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeSecurityCapability {
    /// Ciphering algorithms
    #[serde(default)]
    pub encryption_algorithms: Vec<String>,
    /// Integrity algorithms
    #[serde(default)]
    pub integrity_algorithms: Vec<String>,
}

/// Radio standards the UE speaks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeStatus {
    /// 5G NAS support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n1_mode: Option<bool>,
    /// 4G NAS support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s1_mode: Option<bool>,
}

/// Registration (and RegState) spec
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSpec {
    /// Must be `initial`
    #[serde(default)]
    pub registration_type: String,
    /// The UE's concealed identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_identity: Option<MobileIdentityValue>,
    /// Supported algorithms
    #[serde(default)]
    pub ue_security_capability: UeSecurityCapability,
    /// Supported standards
    #[serde(default)]
    pub ue_status: UeStatus,
    /// Slices the UE asks for
    #[serde(default, rename = "requestedNSSAI", skip_serializing_if = "Vec::is_empty")]
    pub requested_nssai: Vec<Nssai>,
}

/// Registration (and RegState) status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    /// Validated, Authenticated, SubscriptionInfoRetrieved and Ready
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Resolved permanent identity, internal only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
    /// Assigned temporary identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guti: Option<String>,
    /// Slices granted to the UE
    #[serde(default, rename = "allowedNSSAI", skip_serializing_if = "Vec::is_empty")]
    pub allowed_nssai: Vec<Nssai>,
    /// Connection profile minted by UDM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// Network configuration request item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    /// `IPConfiguration` or `DNSServer`
    #[serde(rename = "type", default)]
    pub type_: String,
    /// `IPv4`, `IPv6`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_family: Option<String>,
}

/// Requested network configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkConfigurationRequest {
    /// Individual requests
    #[serde(default)]
    pub requests: Vec<NetworkRequest>,
}

/// A QoS flow
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosFlow {
    /// Flow name, referenced by rules
    #[serde(default)]
    pub name: String,
    /// Standardized 5QI class name
    #[serde(rename = "fiveQI", default)]
    pub five_qi: String,
    /// Requested bit rates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rates: Option<super::BitRates>,
}

/// A QoS rule binding packet filters to a flow
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosRule {
    /// Rule name
    #[serde(default)]
    pub name: String,
    /// Lower is higher priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precedence: Option<u32>,
    /// Default rule marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    /// Flow name
    #[serde(default)]
    pub qos_flow: String,
    /// Packet filters, free-form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Value>,
}

/// Flows and rules
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QosSpec {
    /// QoS flows
    #[serde(default)]
    pub flows: Vec<QosFlow>,
    /// QoS rules
    #[serde(default)]
    pub rules: Vec<QosRule>,
}

/// Session spec
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpec {
    /// Owning UE's temporary identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guti: Option<String>,
    /// Idle flag, unset means active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle: Option<bool>,
    /// Requested slice type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nssai: Option<String>,
    /// PDU session id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    /// `IPv4`, `IPv6`, `IPv4v6`, `Ethernet` or `Unstructured`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdu_session_type: Option<String>,
    /// Session and service continuity mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssc_mode: Option<String>,
    /// Requested addressing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfigurationRequest>,
    /// Requested QoS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos: Option<QosSpec>,
}

/// Session status, projected from the SessionContext
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Validated, PolicyApplied, UPFConfigured and Ready
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Granted addressing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<crate::resources::smf::NetworkConfiguration>,
    /// Granted QoS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos: Option<QosSpec>,
}

/// ContextRelease spec
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextReleaseSpec {
    /// Owning UE's temporary identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guti: Option<String>,
    /// Session to put to idle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
}

/// ContextRelease status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextReleaseStatus {
    /// Ready
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// The SessionContext this release applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<ObjectRef>,
}

/// Entry of the active registration table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveRegistration {
    /// Registration name
    pub name: String,
    /// Registration namespace
    pub namespace: String,
    /// Assigned temporary identity
    pub guti: String,
    /// Concealed identity
    #[serde(default)]
    pub suci: String,
    /// Permanent identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
}
