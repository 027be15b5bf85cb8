//! PCF policy lookups over the seeded `policies` table.

use crate::support::spec;
use fivegc_core::resources::pcf::SlicePolicy;
use fivegc_core::Object;
use fivegc_runtime::TransformError;

/// Outcome of looking up a slice policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyLookup {
    /// The table is not in the store yet
    Pending,
    /// The table has no entry for the slice
    NotFound,
    /// The slice policy
    Found(SlicePolicy),
}

/// Find the policy for `nssai` in the policy table
pub fn lookup(table: Option<&Object>, nssai: &str) -> Result<PolicyLookup, TransformError> {
    let Some(table) = table else {
        return Ok(PolicyLookup::Pending);
    };
    let policies: Vec<SlicePolicy> = spec(table)?;
    Ok(policies
        .into_iter()
        .find(|p| p.nssai == nssai)
        .map_or(PolicyLookup::NotFound, PolicyLookup::Found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fivegc_core::resources::pcf::POLICIES;
    use fivegc_core::{Kind, ObjectKey};
    use serde_json::json;

    #[test]
    fn lookup_states() {
        assert_eq!(lookup(None, "eMBB").unwrap(), PolicyLookup::Pending);

        let mut table = Object::new(&ObjectKey::cluster(Kind::PolicyTable, POLICIES));
        table.spec = json!([{"nssai": "eMBB", "pduSessionTypes": ["IPv4"], "qos": []}]);
        assert_eq!(lookup(Some(&table), "URLLC").unwrap(), PolicyLookup::NotFound);
        match lookup(Some(&table), "eMBB").unwrap() {
            PolicyLookup::Found(policy) => assert!(policy.allows_pdu_type(None)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_table_is_a_decode_error() {
        let mut table = Object::new(&ObjectKey::cluster(Kind::PolicyTable, POLICIES));
        table.spec = json!({"nssai": 1});
        assert!(matches!(
            lookup(Some(&table), "eMBB"),
            Err(TransformError::Decode { .. })
        ));
    }
}
