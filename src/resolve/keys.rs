use lazy_static::lazy_static;
use std::any::TypeId;
use std::sync::Arc;

use super::cache::ResolveCache;
use crate::core::{AuditError, Result};
use crate::metadata::{KeyShape, MetadataModel};

lazy_static! {
    static ref PRIMARY_KEY_CACHE: ResolveCache<TypeId, KeyShape> = ResolveCache::new();
}

/// Ordered primary-key property set of an entity type, cached per type
/// for the process lifetime. Repeated calls for the same type return
/// the shared cached shape without touching the metadata model.
///
/// `type_name` only feeds diagnostics; an unmapped type or a type with
/// no declared primary key is a hard configuration error and is not
/// cached, so a retry against corrected metadata can succeed.
pub fn resolve_primary_key(
    model: &dyn MetadataModel,
    type_id: TypeId,
    type_name: &str,
) -> Result<Arc<KeyShape>> {
    PRIMARY_KEY_CACHE.get_or_try_insert_with(type_id, || {
        let entity = model
            .find_entity_type(type_id)
            .ok_or_else(|| AuditError::EntityTypeNotFound(type_name.to_string()))?;
        entity
            .primary_key()
            .cloned()
            .ok_or_else(|| AuditError::PrimaryKeyNotFound(type_name.to_string()))
    })
}
