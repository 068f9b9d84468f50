// ============================================================================
// Auditrail Library
// ============================================================================
//
// Deferred audit-trail engine for persistent-storage access layers.
//
// Business code registers audit intents against a unit-of-work scoped
// `PostponedAuditManager` while it runs; at a single trigger point the
// manager materializes every intent into an audit record (diff, canonical
// entity identifier, action metadata) and hands the batch to the
// persistence layer's pending-write set. Eager-load paths and primary-key
// shapes are resolved once per entity type and cached for the process
// lifetime.

pub mod context;
pub mod core;
pub mod metadata;
pub mod postponed;
pub mod resolve;

// Re-export main types for convenience
pub use crate::context::{AuditContext, AuditContextExt, Auditable};
pub use crate::core::{
    ActionFactory, ActionKind, AuditError, AuditResult, Result, StandardActionFactory,
    StandardAuditAction,
};
pub use crate::metadata::{EntityType, KeyProperty, KeyShape, MetadataModel, MetadataRegistry, Navigation};
pub use crate::postponed::{PostponedAuditManager, PostponedAuditStorage};
pub use crate::resolve::{DEFAULT_INCLUDE_DEPTH, audit_entity_id, include_paths, resolve_primary_key};
