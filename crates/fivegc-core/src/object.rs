//! Versioned, namespaced records.
//!
//! An [`Object`] carries free-form JSON `spec` and `status` documents. Typed
//! views over them live in [`crate::resources`]; the store itself only cares
//! about identity, versions and labels.

use crate::conditions::Condition;
use crate::errors::{CoreError, Result};
use crate::kind::Kind;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Label used as a coarse, cached state tag
pub const STATE_LABEL: &str = "state";

/// Identity of an object: kind, namespace (empty for cluster scope) and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Resource kind
    pub kind: Kind,
    /// Namespace, empty for cluster-scoped kinds
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Build a key
    pub fn new(kind: Kind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a cluster-scoped object
    pub fn cluster(kind: Kind, name: impl Into<String>) -> Self {
        Self::new(kind, "", name)
    }

    /// Same namespace and name, different kind
    pub fn with_kind(&self, kind: Kind) -> Self {
        Self::new(kind, self.namespace.clone(), self.name.clone())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Store-maintained metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name
    pub name: String,
    /// Namespace, empty for cluster scope
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Coarse state tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Version stamped on every write; 0 means "never stored"
    #[serde(default)]
    pub resource_version: u64,
    /// Incremented when the spec changes
    #[serde(default)]
    pub generation: u64,
    /// Set by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObject", into = "RawObject")]
pub struct Object {
    /// Resource kind
    pub kind: Kind,
    /// Identity and versions
    pub metadata: ObjectMeta,
    /// User-writable desired state
    pub spec: Value,
    /// System-writable observed state
    pub status: Option<Value>,
}

/// Wire representation: group and kind are split as on the API
#[derive(Serialize, Deserialize)]
struct RawObject {
    group: String,
    kind: String,
    metadata: ObjectMeta,
    #[serde(default)]
    spec: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<Value>,
}

impl TryFrom<RawObject> for Object {
    type Error = CoreError;

    fn try_from(raw: RawObject) -> Result<Self> {
        let kind = Kind::from_parts(&raw.group, &raw.kind).ok_or_else(|| {
            CoreError::invalid(format!("unknown kind {}/{}", raw.group, raw.kind))
        })?;
        Ok(Object {
            kind,
            metadata: raw.metadata,
            spec: raw.spec,
            status: raw.status,
        })
    }
}

impl From<Object> for RawObject {
    fn from(obj: Object) -> Self {
        RawObject {
            group: obj.kind.group().to_string(),
            kind: obj.kind.name().to_string(),
            metadata: obj.metadata,
            spec: obj.spec,
            status: obj.status,
        }
    }
}

impl Object {
    /// New, never-stored object with an empty spec
    pub fn new(key: &ObjectKey) -> Self {
        Self {
            kind: key.kind,
            metadata: ObjectMeta {
                name: key.name.clone(),
                namespace: key.namespace.clone(),
                ..ObjectMeta::default()
            },
            spec: Value::Object(Default::default()),
            status: None,
        }
    }

    /// New object with a typed spec
    pub fn with_spec<S: Serialize>(key: &ObjectKey, spec: &S) -> Result<Self> {
        let mut obj = Self::new(key);
        obj.spec = serde_json::to_value(spec)?;
        Ok(obj)
    }

    /// Key of this object
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(
            self.kind,
            self.metadata.namespace.clone(),
            self.metadata.name.clone(),
        )
    }

    /// Object name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Object namespace
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Decode the spec into a typed view
    pub fn spec_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.spec.clone())?)
    }

    /// Decode the status into a typed view; absent status decodes as default
    pub fn status_as<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match &self.status {
            Some(status) => Ok(serde_json::from_value(status.clone())?),
            None => Ok(T::default()),
        }
    }

    /// Replace the spec from a typed value
    pub fn set_spec<S: Serialize>(&mut self, spec: &S) -> Result<()> {
        self.spec = serde_json::to_value(spec)?;
        Ok(())
    }

    /// Replace the status from a typed value
    pub fn set_status<S: Serialize>(&mut self, status: &S) -> Result<()> {
        self.status = Some(serde_json::to_value(status)?);
        Ok(())
    }

    /// Conditions in the status, if any
    pub fn conditions(&self) -> Vec<Condition> {
        self.status
            .as_ref()
            .and_then(|s| s.get("conditions"))
            .and_then(|c| serde_json::from_value(c.clone()).ok())
            .unwrap_or_default()
    }

    /// Label value
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    /// Set a label
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.labels.insert(key.into(), value.into());
    }

    /// True when spec, status and labels match; versions are ignored
    pub fn same_content(&self, other: &Object) -> bool {
        self.kind == other.kind
            && self.spec == other.spec
            && self.status == other.status
            && self.metadata.labels == other.metadata.labels
    }

    /// The patchable document: `{metadata: {labels}, spec, status}`
    pub fn patch_document(&self) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert(
            "metadata".into(),
            serde_json::json!({ "labels": self.metadata.labels }),
        );
        doc.insert("spec".into(), self.spec.clone());
        if let Some(status) = &self.status {
            doc.insert("status".into(), status.clone());
        }
        Value::Object(doc)
    }

    /// Rebuild spec, status and labels from a patched document
    pub fn apply_patch_document(&mut self, doc: Value) -> Result<()> {
        let Value::Object(mut doc) = doc else {
            return Err(CoreError::invalid("patched document is not an object"));
        };
        let labels = doc
            .remove("metadata")
            .and_then(|m| m.get("labels").cloned())
            .map(serde_json::from_value::<BTreeMap<String, String>>)
            .transpose()?
            .unwrap_or_default();
        self.metadata.labels = labels;
        self.spec = doc
            .remove("spec")
            .unwrap_or_else(|| Value::Object(Default::default()));
        self.status = doc.remove("status");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_round_trips_through_json() {
        let key = ObjectKey::new(Kind::UpfConfig, "guti-1", "s1");
        let value = serde_json::to_value(&key).unwrap();
        assert_eq!(
            value,
            json!({"kind": "upf/Config", "namespace": "guti-1", "name": "s1"})
        );
        assert_eq!(serde_json::from_value::<ObjectKey>(value).unwrap(), key);
    }

    #[test]
    fn wire_shape_splits_group_and_kind() {
        let key = ObjectKey::new(Kind::UdmConfig, "default", "guti-1");
        let obj = Object::new(&key);
        let value = serde_json::to_value(&obj).unwrap();
        assert_eq!(value["group"], "udm");
        assert_eq!(value["kind"], "Config");
        assert_eq!(value["metadata"]["name"], "guti-1");

        let back: Object = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind, Kind::UdmConfig);
        assert_eq!(back.key(), key);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = json!({"group": "nrf", "kind": "Profile", "metadata": {"name": "x"}});
        let err = serde_json::from_value::<Object>(raw).unwrap_err();
        assert!(err.to_string().contains("unknown kind"));
    }

    #[test]
    fn patch_document_round_trip_keeps_labels() {
        let key = ObjectKey::new(Kind::MobileIdentity, "default", "reg");
        let mut obj = Object::new(&key);
        obj.set_label(STATE_LABEL, "Ready");
        obj.spec = json!({"suci": "suci-1"});
        let doc = obj.patch_document();

        let mut copy = Object::new(&key);
        copy.apply_patch_document(doc).unwrap();
        assert!(copy.same_content(&obj));
    }

    #[test]
    fn cluster_keys_display_without_namespace() {
        let key = ObjectKey::cluster(Kind::PolicyTable, "policies");
        assert_eq!(key.to_string(), "pcf/PolicyTable/policies");
    }
}
