//! Typed views over resource specs and statuses.
//!
//! Every field is optional or defaulted: a missing field must surface as a
//! validation reason in the owning pipeline, never as a decode error.

pub mod amf;
pub mod ausf;
pub mod pcf;
pub mod smf;
pub mod udm;
pub mod upf;

use serde::{Deserialize, Serialize};

/// Condition type names shared across functions
pub mod condition {
    /// Input validation outcome
    pub const VALIDATED: &str = "Validated";
    /// SUCI to SUPI resolution outcome
    pub const AUTHENTICATED: &str = "Authenticated";
    /// UDM credential outcome
    pub const SUBSCRIPTION_INFO_RETRIEVED: &str = "SubscriptionInfoRetrieved";
    /// Policy merge outcome
    pub const POLICY_APPLIED: &str = "PolicyApplied";
    /// User plane provisioning outcome
    pub const UPF_CONFIGURED: &str = "UPFConfigured";
    /// Aggregate readiness
    pub const READY: &str = "Ready";
}

/// Reference to a namespaced object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
}

impl ObjectRef {
    /// Build a reference
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

/// A network slice selector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nssai {
    /// Slice/service type, e.g. `eMBB`
    #[serde(default)]
    pub slice_type: String,
    /// Slice differentiator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_differentiator: Option<String>,
}

/// Uplink/downlink bit rates in kbps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitRates {
    /// Uplink bandwidth
    #[serde(default)]
    pub uplink_bw_kbps: u64,
    /// Downlink bandwidth
    #[serde(default)]
    pub downlink_bw_kbps: u64,
}

impl BitRates {
    /// Component-wise minimum
    pub fn capped(self, max: BitRates) -> BitRates {
        BitRates {
            uplink_bw_kbps: self.uplink_bw_kbps.min(max.uplink_bw_kbps),
            downlink_bw_kbps: self.downlink_bw_kbps.min(max.downlink_bw_kbps),
        }
    }
}

/// DNS servers handed to the UE
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DnsConfiguration {
    /// Primary resolver
    #[serde(rename = "primaryDNS", default)]
    pub primary_dns: String,
    /// Secondary resolver
    #[serde(rename = "secondaryDNS", default)]
    pub secondary_dns: String,
}
