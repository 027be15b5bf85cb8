//! Decoding and table helpers shared by the pipelines.

use fivegc_core::{Object, ObjectKey};
use fivegc_runtime::{TransformError, Write};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn spec<T: DeserializeOwned>(object: &Object) -> Result<T, TransformError> {
    object
        .spec_as()
        .map_err(|e| TransformError::decode(&object.key(), e.to_string()))
}

pub(crate) fn status<T: DeserializeOwned + Default>(object: &Object) -> Result<T, TransformError> {
    object
        .status_as()
        .map_err(|e| TransformError::decode(&object.key(), e.to_string()))
}

/// Rows of a table singleton; an absent table has no rows
pub(crate) fn rows<T: DeserializeOwned>(table: Option<&Object>) -> Result<Vec<T>, TransformError> {
    match table {
        None => Ok(Vec::new()),
        Some(table) if table.spec.is_null() => Ok(Vec::new()),
        Some(table) if table.spec.as_object().is_some_and(|m| m.is_empty()) => Ok(Vec::new()),
        Some(table) => spec(table),
    }
}

/// The stored object to edit, or a fresh one
pub(crate) fn edit(existing: Option<&Object>, key: &ObjectKey) -> Object {
    existing.cloned().unwrap_or_else(|| Object::new(key))
}

/// Full rebuild of a table singleton
pub(crate) fn rebuild<T: Serialize>(
    current: Option<&Object>,
    key: &ObjectKey,
    rows: &[T],
) -> Result<Vec<Write>, TransformError> {
    let mut table = edit(current, key);
    table.spec = serde_json::to_value(rows).map_err(fivegc_core::CoreError::from)?;
    Ok(vec![Write::Apply(table)])
}
