//! UPF resources.

use super::amf::QosSpec;
use super::smf::NetworkConfiguration;
use serde::{Deserialize, Serialize};

/// Name of the active config table singleton
pub const ACTIVE_CONFIGS: &str = "active-configs";

/// User plane provisioning for one session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpfConfigSpec {
    /// Owning UE's temporary identity
    #[serde(default)]
    pub guti: String,
    /// PDU session id
    #[serde(default)]
    pub session_id: i64,
    /// Allocated addressing
    #[serde(default)]
    pub network_configuration: NetworkConfiguration,
    /// Policy-filtered QoS
    #[serde(default)]
    pub qos: QosSpec,
}

/// Entry of the active config table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConfig {
    /// Config name
    pub name: String,
    /// Config namespace
    pub namespace: String,
    /// The provisioned traffic spec
    pub traffic_spec: UpfConfigSpec,
}
