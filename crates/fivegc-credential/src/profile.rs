//! Kubeconfig-shaped connection profile.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cluster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEntry {
    /// Boundary URL
    pub server: String,
    /// Skip server certificate checks
    #[serde(rename = "insecure-skip-tls-verify", default)]
    pub insecure_skip_tls_verify: bool,
}

/// User entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Bearer token
    pub token: String,
}

/// Context entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Cluster entry name
    pub cluster: String,
    /// User entry name
    pub user: String,
    /// Default namespace
    pub namespace: String,
}

/// Everything a client needs to talk to the boundary as one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Clusters by name
    pub clusters: BTreeMap<String, ClusterEntry>,
    /// Users by name
    pub users: BTreeMap<String, UserEntry>,
    /// Contexts by name
    pub contexts: BTreeMap<String, ContextEntry>,
    /// Context used by default
    #[serde(rename = "current-context")]
    pub current_context: String,
}

/// Where the profile points and how it trusts the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOptions {
    /// Boundary URL, e.g. `https://127.0.0.1:8443`
    pub server: String,
    /// Name of the cluster and context entries
    pub cluster_name: String,
    /// Emit `insecure-skip-tls-verify: true`
    pub insecure: bool,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            server: "https://127.0.0.1:8443".to_string(),
            cluster_name: "fivegc".to_string(),
            insecure: true,
        }
    }
}

impl ConnectionProfile {
    /// Profile with one cluster, one user and one context binding them
    pub fn single(options: &ProfileOptions, user: &str, namespace: &str, token: String) -> Self {
        let cluster = options.cluster_name.clone();
        Self {
            clusters: BTreeMap::from([(
                cluster.clone(),
                ClusterEntry {
                    server: options.server.clone(),
                    insecure_skip_tls_verify: options.insecure,
                },
            )]),
            users: BTreeMap::from([(user.to_string(), UserEntry { token })]),
            contexts: BTreeMap::from([(
                cluster.clone(),
                ContextEntry {
                    cluster: cluster.clone(),
                    user: user.to_string(),
                    namespace: namespace.to_string(),
                },
            )]),
            current_context: cluster,
        }
    }

    /// Token of the user bound by the current context
    pub fn current_token(&self) -> Option<&str> {
        let context = self.contexts.get(&self.current_context)?;
        self.users.get(&context.user).map(|u| u.token.as_str())
    }
}
