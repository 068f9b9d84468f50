use serde_json::Value;
use std::any::{Any, TypeId, type_name};

use super::keys::resolve_primary_key;
use crate::context::AuditContext;
use crate::core::Result;

/// Canonical identifier string of a live entity instance: the ordered
/// primary-key values serialized as a JSON array of stringified
/// components, e.g. `["42"]` or `["7","B"]`.
///
/// Values are read through the context's live-tracking facility rather
/// than the instance's raw fields, so an identifier generated by an
/// earlier save within the unit of work is picked up. Calls before key
/// assignment may legitimately differ from calls after; once the key is
/// assigned the string is stable.
pub fn audit_entity_id<C, M>(context: &C, model: &M) -> Result<String>
where
    C: AuditContext + ?Sized,
    M: Any,
{
    let shape = resolve_primary_key(context.model(), TypeId::of::<M>(), type_name::<M>())?;

    let keys: Vec<Option<String>> = shape
        .properties()
        .iter()
        .map(|property| {
            context
                .read_current(model, property)
                .and_then(stringify_key_component)
        })
        .collect();

    Ok(serde_json::to_string(&keys)?)
}

/// JSON strings contribute their raw content; every other value uses
/// its display form. An explicit JSON null is the same as no value.
fn stringify_key_component(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}
