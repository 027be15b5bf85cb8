//! System configuration, loadable from TOML.

use crate::error::SystemError;
use fivegc_core::resources::DnsConfiguration;
use fivegc_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Boundary settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address
    pub address: String,
    /// Bind port
    pub port: u16,
    /// Plain HTTP without TLS or authentication
    pub http_mode: bool,
    /// TLS certificate, required unless `http_mode`
    pub cert_file: Option<PathBuf>,
    /// TLS key
    pub key_file: Option<PathBuf>,
    /// Accept unauthenticated requests
    pub disable_auth: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8443,
            http_mode: false,
            cert_file: None,
            key_file: None,
            disable_auth: false,
        }
    }
}

impl ApiConfig {
    /// URL clients use to reach the boundary
    pub fn server_url(&self) -> String {
        let scheme = if self.http_mode { "http" } else { "https" };
        format!("{scheme}://{}:{}", self.address, self.port)
    }
}

/// SMF addressing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmfConfig {
    /// UE pool in CIDR form
    pub pool: String,
    /// Gateway inside the pool
    pub gateway: String,
    /// Resolvers used when a slice policy names none
    pub dns: DnsConfiguration,
}

impl Default for SmfConfig {
    fn default() -> Self {
        Self {
            pool: "10.45.0.0/24".to_string(),
            gateway: "10.45.0.1".to_string(),
            dns: DnsConfiguration {
                primary_dns: "8.8.8.8".to_string(),
                secondary_dns: "8.8.4.4".to_string(),
            },
        }
    }
}

/// UDM credential settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdmConfig {
    /// Cluster and context name in issued profiles
    pub cluster_name: String,
    /// Credential lifetime
    #[serde(rename = "token_ttl_secs", with = "secs")]
    pub token_ttl: Duration,
    /// Hex ed25519 seed; a fresh key is generated when unset
    pub signing_key_file: Option<PathBuf>,
}

impl Default for UdmConfig {
    fn default() -> Self {
        Self {
            cluster_name: "fivegc".to_string(),
            token_ttl: Duration::from_secs(168 * 3600),
            signing_key_file: None,
        }
    }
}

/// Catalogue overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    /// Slice policy TOML
    pub policies: Option<PathBuf>,
    /// SUCI to SUPI TOML
    pub suci_to_supi: Option<PathBuf>,
}

/// Everything [`crate::System::new`] needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Boundary
    pub api: ApiConfig,
    /// Reconciler runtime
    pub runtime: RuntimeConfig,
    /// SMF
    pub smf: SmfConfig,
    /// UDM
    pub udm: UdmConfig,
    /// Static catalogues
    pub catalogues: CatalogueConfig,
}

impl SystemConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self, SystemError> {
        toml::from_str(text).map_err(|e| SystemError::Config(e.to_string()))
    }

    /// Read a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SystemError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SystemError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
