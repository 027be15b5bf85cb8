//! Resource kinds and the network function that owns each of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network function group a kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Access and mobility management
    Amf,
    /// Authentication server
    Ausf,
    /// Unified data management
    Udm,
    /// Session management
    Smf,
    /// User plane
    Upf,
    /// Policy control
    Pcf,
}

impl Group {
    /// Wire name of the group
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Amf => "amf",
            Group::Ausf => "ausf",
            Group::Udm => "udm",
            Group::Smf => "smf",
            Group::Upf => "upf",
            Group::Pcf => "pcf",
        }
    }

    /// Parse a wire group name
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "amf" => Group::Amf,
            "ausf" => Group::Ausf,
            "udm" => Group::Udm,
            "smf" => Group::Smf,
            "upf" => Group::Upf,
            "pcf" => Group::Pcf,
            _ => return None,
        })
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every resource kind the system knows about.
///
/// The set is closed: the store, the runtime and the boundary reject anything
/// else at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// User-facing registration request
    Registration,
    /// AMF working state, 1:1 with a Registration
    RegState,
    /// User-facing PDU session request
    Session,
    /// Idle-transition request
    ContextRelease,
    /// Derived list of registrations that reached Ready
    ActiveRegistrationTable,
    /// SUCI to SUPI resolution request
    MobileIdentity,
    /// Static SUCI to SUPI catalogue
    SuciToSupiTable,
    /// Credential request keyed by GUTI
    UdmConfig,
    /// SMF working state for a session
    SessionContext,
    /// Derived list of validated, policy-applied sessions
    ActiveSessionTable,
    /// Per-session user plane provisioning
    UpfConfig,
    /// Derived list of live UPF configs
    ActiveConfigTable,
    /// Static slice/QoS policy catalogue
    PolicyTable,
}

impl Kind {
    /// All kinds, in a stable order
    pub const ALL: [Kind; 13] = [
        Kind::Registration,
        Kind::RegState,
        Kind::Session,
        Kind::ContextRelease,
        Kind::ActiveRegistrationTable,
        Kind::MobileIdentity,
        Kind::SuciToSupiTable,
        Kind::UdmConfig,
        Kind::SessionContext,
        Kind::ActiveSessionTable,
        Kind::UpfConfig,
        Kind::ActiveConfigTable,
        Kind::PolicyTable,
    ];

    /// Owning function group
    pub fn group(&self) -> Group {
        match self {
            Kind::Registration
            | Kind::RegState
            | Kind::Session
            | Kind::ContextRelease
            | Kind::ActiveRegistrationTable => Group::Amf,
            Kind::MobileIdentity | Kind::SuciToSupiTable => Group::Ausf,
            Kind::UdmConfig => Group::Udm,
            Kind::SessionContext | Kind::ActiveSessionTable => Group::Smf,
            Kind::UpfConfig | Kind::ActiveConfigTable => Group::Upf,
            Kind::PolicyTable => Group::Pcf,
        }
    }

    /// Kind name as it appears on the wire (unique only within a group)
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Registration => "Registration",
            Kind::RegState => "RegState",
            Kind::Session => "Session",
            Kind::ContextRelease => "ContextRelease",
            Kind::ActiveRegistrationTable => "ActiveRegistrationTable",
            Kind::MobileIdentity => "MobileIdentity",
            Kind::SuciToSupiTable => "SuciToSupiTable",
            Kind::UdmConfig | Kind::UpfConfig => "Config",
            Kind::SessionContext => "SessionContext",
            Kind::ActiveSessionTable => "ActiveSessionTable",
            Kind::ActiveConfigTable => "ActiveConfigTable",
            Kind::PolicyTable => "PolicyTable",
        }
    }

    /// Lower-case plural resource name used by access rules and API paths
    pub fn resource(&self) -> &'static str {
        match self {
            Kind::Registration => "registrations",
            Kind::RegState => "regstates",
            Kind::Session => "sessions",
            Kind::ContextRelease => "contextreleases",
            Kind::ActiveRegistrationTable => "activeregistrationtables",
            Kind::MobileIdentity => "mobileidentities",
            Kind::SuciToSupiTable => "sucitosupitables",
            Kind::UdmConfig | Kind::UpfConfig => "configs",
            Kind::SessionContext => "sessioncontexts",
            Kind::ActiveSessionTable => "activesessiontables",
            Kind::ActiveConfigTable => "activeconfigtables",
            Kind::PolicyTable => "policytables",
        }
    }

    /// Resolve a (group, kind name) pair
    pub fn from_parts(group: &str, name: &str) -> Option<Kind> {
        let group = Group::parse(group)?;
        Kind::ALL
            .into_iter()
            .find(|k| k.group() == group && (k.name() == name || k.resource() == name))
    }

    /// Cluster-scoped kinds live in the empty namespace
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(
            self,
            Kind::ActiveRegistrationTable
                | Kind::SuciToSupiTable
                | Kind::ActiveSessionTable
                | Kind::ActiveConfigTable
                | Kind::PolicyTable
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group(), self.name())
    }
}

impl std::str::FromStr for Kind {
    type Err = String;

    /// Parse the `group/Name` form produced by `Display`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_once('/')
            .and_then(|(group, name)| Kind::from_parts(group, name))
            .ok_or_else(|| format!("unknown kind {s:?}"))
    }
}

impl Serialize for Kind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_kinds_are_distinguished_by_group() {
        assert_eq!(Kind::from_parts("udm", "Config"), Some(Kind::UdmConfig));
        assert_eq!(Kind::from_parts("upf", "Config"), Some(Kind::UpfConfig));
        assert_eq!(Kind::from_parts("upf", "configs"), Some(Kind::UpfConfig));
        assert_eq!(Kind::from_parts("amf", "Config"), None);
        assert_eq!(Kind::from_parts("nrf", "Config"), None);
    }

    #[test]
    fn every_kind_round_trips_through_its_parts() {
        for kind in Kind::ALL {
            assert_eq!(
                Kind::from_parts(kind.group().as_str(), kind.name()),
                Some(kind)
            );
        }
    }

    #[test]
    fn kind_serializes_as_group_and_name() {
        assert_eq!(
            serde_json::to_value(Kind::UdmConfig).unwrap(),
            serde_json::json!("udm/Config")
        );
        for kind in Kind::ALL {
            let text = serde_json::to_string(&kind).unwrap();
            assert_eq!(serde_json::from_str::<Kind>(&text).unwrap(), kind);
        }
        assert!(serde_json::from_str::<Kind>("\"amf/Widget\"").is_err());
        assert!(serde_json::from_str::<Kind>("\"Session\"").is_err());
    }
}
