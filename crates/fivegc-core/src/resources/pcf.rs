//! PCF policy catalogue.

use super::{BitRates, DnsConfiguration};
use serde::{Deserialize, Serialize};

/// Name of the policy catalogue singleton
pub const POLICIES: &str = "policies";

/// Per-5QI limits inside a slice policy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosPolicy {
    /// Allowed 5QI class
    #[serde(rename = "fiveQI")]
    pub five_qi: String,
    /// Bit rate cap, none means uncapped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bit_rates: Option<BitRates>,
}

/// Policy for one slice type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlicePolicy {
    /// Slice type the policy applies to
    pub nssai: String,
    /// Allowed PDU session types
    #[serde(default)]
    pub pdu_session_types: Vec<String>,
    /// Allowed flows and their caps
    #[serde(default)]
    pub qos: Vec<QosPolicy>,
    /// Resolvers handed out on this slice
    #[serde(default)]
    pub dns: DnsConfiguration,
}

impl SlicePolicy {
    /// Limits for a 5QI class, `None` if the class is not allowed
    pub fn qos_for(&self, five_qi: &str) -> Option<&QosPolicy> {
        self.qos.iter().find(|q| q.five_qi == five_qi)
    }

    /// Whether a PDU session type is allowed; unset is treated as IPv4
    pub fn allows_pdu_type(&self, pdu_type: Option<&str>) -> bool {
        let pdu_type = pdu_type.unwrap_or("IPv4");
        self.pdu_session_types.iter().any(|t| t == pdu_type)
    }
}
