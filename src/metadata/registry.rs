use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::EntityType;
use crate::core::{AuditError, Result};

/// Read-only metadata lookup the resolvers run against.
///
/// One model instance describes the whole relationship graph and is
/// assumed static for the process lifetime; the process-wide path and
/// key caches rely on that.
pub trait MetadataModel: Send + Sync {
    fn find_entity_type(&self, type_id: TypeId) -> Option<&EntityType>;
}

/// Default [`MetadataModel`] implementation.
///
/// Immutable after construction - entity types are added builder-style
/// and the finished registry can be shared freely without locks.
#[derive(Clone, Default)]
pub struct MetadataRegistry {
    entities: Arc<HashMap<TypeId, EntityType>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(HashMap::new()),
        }
    }

    /// Add an entity type - returns a NEW registry, the old one stays
    /// unchanged (same copy-on-write shape as a catalog of schemas).
    pub fn with_entity(self, entity: EntityType) -> Result<Self> {
        if self.entities.contains_key(&entity.type_id()) {
            return Err(AuditError::EntityTypeExists(entity.name().to_string()));
        }

        let mut entities = (*self.entities).clone();
        entities.insert(entity.type_id(), entity);

        Ok(Self {
            entities: Arc::new(entities),
        })
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entities.contains_key(&TypeId::of::<T>())
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.values().map(EntityType::name).collect()
    }
}

impl MetadataModel for MetadataRegistry {
    fn find_entity_type(&self, type_id: TypeId) -> Option<&EntityType> {
        self.entities.get(&type_id)
    }
}
