//! Static catalogues: PCF slice policies and the AUSF identity table.
//!
//! Both are TOML documents, embedded by default and overridable from a file.
//! They are validated once at start-up and seeded into the store as the
//! `policies` and `suci-to-supi` singletons.

use crate::error::CatalogueError;
use fivegc_core::resources::ausf::{SuciToSupi, SUCI_TO_SUPI};
use fivegc_core::resources::pcf::{SlicePolicy, POLICIES};
use fivegc_core::{Kind, Object, ObjectKey, ObjectStore, ObjectStoreExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_POLICIES: &str = include_str!("catalogues/policies.toml");
const DEFAULT_SUCI_TO_SUPI: &str = include_str!("catalogues/suci_to_supi.toml");

#[derive(Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policy: Vec<SlicePolicy>,
}

#[derive(Deserialize)]
struct IdentityFile {
    #[serde(default)]
    entry: Vec<SuciToSupi>,
}

/// Validated catalogue contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogues {
    /// One policy per slice type
    pub policies: Vec<SlicePolicy>,
    /// One row per SUCI
    pub suci_to_supi: Vec<SuciToSupi>,
}

impl Catalogues {
    /// The built-in catalogues
    pub fn embedded() -> Result<Self, CatalogueError> {
        Ok(Self {
            policies: parse_policies(DEFAULT_POLICIES)?,
            suci_to_supi: parse_suci_to_supi(DEFAULT_SUCI_TO_SUPI)?,
        })
    }

    /// Built-in catalogues with either one replaced from a file
    pub fn load(policies: Option<&Path>, suci_to_supi: Option<&Path>) -> Result<Self, CatalogueError> {
        let policies = match policies {
            Some(path) => parse_policies(&read(path)?)?,
            None => parse_policies(DEFAULT_POLICIES)?,
        };
        let suci_to_supi = match suci_to_supi {
            Some(path) => parse_suci_to_supi(&read(path)?)?,
            None => parse_suci_to_supi(DEFAULT_SUCI_TO_SUPI)?,
        };
        Ok(Self {
            policies,
            suci_to_supi,
        })
    }

    /// Write both singletons into the store, replacing earlier contents
    pub async fn seed(&self, store: &dyn ObjectStore) -> fivegc_core::Result<()> {
        seed_table(
            store,
            ObjectKey::cluster(Kind::PolicyTable, POLICIES),
            serde_json::to_value(&self.policies)?,
        )
        .await?;
        seed_table(
            store,
            ObjectKey::cluster(Kind::SuciToSupiTable, SUCI_TO_SUPI),
            serde_json::to_value(&self.suci_to_supi)?,
        )
        .await?;
        tracing::info!(
            policies = self.policies.len(),
            identities = self.suci_to_supi.len(),
            "catalogues seeded"
        );
        Ok(())
    }
}

async fn seed_table(
    store: &dyn ObjectStore,
    key: ObjectKey,
    spec: serde_json::Value,
) -> fivegc_core::Result<()> {
    let mut object = store
        .try_get(&key)
        .await?
        .unwrap_or_else(|| Object::new(&key));
    object.spec = spec;
    store.apply(object).await?;
    Ok(())
}

fn read(path: &Path) -> Result<String, CatalogueError> {
    std::fs::read_to_string(path).map_err(|e| CatalogueError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Parse and validate a policy catalogue
pub fn parse_policies(text: &str) -> Result<Vec<SlicePolicy>, CatalogueError> {
    const NAME: &str = "policy";
    let file: PolicyFile = toml::from_str(text).map_err(|e| CatalogueError::Parse {
        catalogue: NAME,
        message: e.to_string(),
    })?;
    let mut seen = HashSet::new();
    for policy in &file.policy {
        if policy.nssai.is_empty() {
            return Err(CatalogueError::Invalid {
                catalogue: NAME,
                message: "policy without nssai".into(),
            });
        }
        if !seen.insert(policy.nssai.as_str()) {
            return Err(CatalogueError::Duplicate {
                catalogue: NAME,
                key: policy.nssai.clone(),
            });
        }
        let mut classes = HashSet::new();
        for qos in &policy.qos {
            if !classes.insert(qos.five_qi.as_str()) {
                return Err(CatalogueError::Duplicate {
                    catalogue: NAME,
                    key: format!("{}/{}", policy.nssai, qos.five_qi),
                });
            }
        }
    }
    Ok(file.policy)
}

/// Parse and validate an identity catalogue
pub fn parse_suci_to_supi(text: &str) -> Result<Vec<SuciToSupi>, CatalogueError> {
    const NAME: &str = "suci-to-supi";
    let file: IdentityFile = toml::from_str(text).map_err(|e| CatalogueError::Parse {
        catalogue: NAME,
        message: e.to_string(),
    })?;
    let mut seen = HashSet::new();
    for row in &file.entry {
        if row.suci.is_empty() || row.supi.is_empty() {
            return Err(CatalogueError::Invalid {
                catalogue: NAME,
                message: format!("empty identity in row {:?}", row.suci),
            });
        }
        if !seen.insert(row.suci.as_str()) {
            return Err(CatalogueError::Duplicate {
                catalogue: NAME,
                key: row.suci.clone(),
            });
        }
    }
    Ok(file.entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalogues_are_valid() {
        let catalogues = Catalogues::embedded().unwrap();
        let embb = catalogues
            .policies
            .iter()
            .find(|p| p.nssai == "eMBB")
            .unwrap();
        let voice = embb.qos_for("ConversationalVoice").unwrap();
        assert_eq!(voice.max_bit_rates.unwrap().uplink_bw_kbps, 128);
        assert!(embb.qos_for("BestEffort").unwrap().max_bit_rates.is_none());
        assert!(catalogues
            .suci_to_supi
            .iter()
            .any(|r| r.suci == "suci-0-999-01-02-4f2a7b9c8d13e7a5c0"
                && r.supi == "imsi-999010000000123"));
    }

    #[test]
    fn duplicate_suci_is_rejected() {
        let text = r#"
            [[entry]]
            suci = "a"
            supi = "imsi-1"
            [[entry]]
            suci = "a"
            supi = "imsi-2"
        "#;
        assert_eq!(
            parse_suci_to_supi(text),
            Err(CatalogueError::Duplicate {
                catalogue: "suci-to-supi",
                key: "a".into()
            })
        );
    }

    #[test]
    fn malformed_policy_is_rejected() {
        assert!(matches!(
            parse_policies("[[policy]]\nnssai = 3"),
            Err(CatalogueError::Parse { .. })
        ));
        assert!(matches!(
            parse_policies("[[policy]]\nnssai = \"\""),
            Err(CatalogueError::Invalid { .. })
        ));
    }

    #[test]
    fn catalogue_file_overrides_embedded_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.toml");
        std::fs::write(&path, "[[entry]]\nsuci = \"suci-x\"\nsupi = \"imsi-x\"\n").unwrap();
        let catalogues = Catalogues::load(None, Some(&path)).unwrap();
        assert_eq!(catalogues.suci_to_supi.len(), 1);
        assert!(!catalogues.policies.is_empty());

        let missing = Catalogues::load(Some(Path::new("/nonexistent.toml")), None);
        assert!(matches!(missing, Err(CatalogueError::Read { .. })));
    }
}
