//! UDM credential request.

use super::ObjectRef;
use crate::conditions::Condition;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Config request spec; the object is named after the GUTI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UdmConfigSpec {
    /// Subject of the credential
    #[serde(default)]
    pub guti: String,
    /// Registration that asked for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<ObjectRef>,
}

/// Config result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdmConfigStatus {
    /// Ready
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Connection profile with the embedded bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Spec generation the status was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<u64>,
}
