//! AUSF resources.

use crate::conditions::Condition;
use serde::{Deserialize, Serialize};

/// Name of the SUCI to SUPI catalogue singleton
pub const SUCI_TO_SUPI: &str = "suci-to-supi";

/// MobileIdentity request spec
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MobileIdentitySpec {
    /// Concealed identity to resolve
    #[serde(default)]
    pub suci: String,
}

/// MobileIdentity result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MobileIdentityStatus {
    /// Ready
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Echo of the request
    #[serde(default)]
    pub suci: String,
    /// Resolved permanent identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
}

/// One catalogue row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuciToSupi {
    /// Concealed identity
    pub suci: String,
    /// Permanent identity
    pub supi: String,
}
