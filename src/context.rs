use async_trait::async_trait;
use serde_json::Value;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use crate::core::{ActionKind, AuditError, AuditResult, Result};
use crate::metadata::{KeyProperty, KeyShape, MetadataModel};
use crate::resolve::{self, DEFAULT_INCLUDE_DEPTH};

/// Handle to the active data-access context of one unit of work.
///
/// This is the boundary to the surrounding persistence layer: metadata
/// lookup, live-tracked value reads, the pending-write set and the
/// query surface all live behind it. The audit engine never commits;
/// records handed to [`bulk_insert`](AuditContext::bulk_insert) join
/// the context's pending writes and commit under the host's own
/// transaction discipline.
#[async_trait]
pub trait AuditContext: Send + Sync {
    /// Closed action-kind set of this deployment.
    type Kind: ActionKind;
    /// Action metadata attached to every materialized record.
    type Action: Send + 'static;
    /// Materialized audit record type.
    type Record: AuditResult<Self::Action>;
    /// Lazy query over persisted audit results.
    type Query: Send;

    fn model(&self) -> &dyn MetadataModel;

    /// Current live-tracked value of one key property of a tracked
    /// instance. The context may hold a newer value than the raw field,
    /// e.g. a generated identifier assigned by an earlier save.
    fn read_current(&self, instance: &dyn Any, property: &KeyProperty) -> Option<Value>;

    /// Append materialized records to the pending-write set in order.
    async fn bulk_insert(&self, records: Vec<Self::Record>) -> Result<()>;

    /// Lazy query over the audit results persisted for one entity type,
    /// or `None` when no query source exists for it.
    fn audit_queryable(&self, type_id: TypeId) -> Option<Self::Query>;

    /// Extend a query with one dot-joined eager-load path.
    fn apply_eager_load(&self, query: Self::Query, path: &str) -> Self::Query;
}

/// A tracked model type whose changes can be audited.
///
/// `audit` is the external diff/snapshot capability: it inspects the
/// instance against the context's tracked state and produces the
/// record body. Action metadata is attached afterwards by the finalize
/// pipeline; implementations leave it unset.
#[async_trait]
pub trait Auditable<C: AuditContext + ?Sized>: Send + Sync + 'static {
    async fn audit(&self, context: &C) -> Result<C::Record>;
}

/// Resolver entry points hung off any [`AuditContext`], mirroring the
/// shape business code actually uses: `context.audit_entity_id(&model)`
/// and friends.
pub trait AuditContextExt: AuditContext {
    /// Eager-load paths for `M` at the default depth bound.
    fn include_paths<M: Any>(&self) -> Result<Arc<Vec<String>>> {
        self.include_paths_with_depth::<M>(DEFAULT_INCLUDE_DEPTH)
    }

    fn include_paths_with_depth<M: Any>(&self, depth: usize) -> Result<Arc<Vec<String>>> {
        resolve::include_paths(self.model(), TypeId::of::<M>(), depth)
    }

    /// Ordered primary-key shape of `M`; configuration error if `M` is
    /// not modeled or declares no key.
    fn entity_primary_key<M: Any>(&self) -> Result<Arc<KeyShape>> {
        resolve::resolve_primary_key(self.model(), TypeId::of::<M>(), type_name::<M>())
    }

    /// Canonical JSON-array identifier of a live instance of `M`.
    fn audit_entity_id<M: Any>(&self, model: &M) -> Result<String> {
        resolve::audit_entity_id(self, model)
    }

    /// Audit-result query for `M` with every eager-load path applied,
    /// at the default depth bound.
    fn audit_query<M: Any>(&self) -> Result<Self::Query> {
        self.audit_query_with_depth::<M>(DEFAULT_INCLUDE_DEPTH)
    }

    fn audit_query_with_depth<M: Any>(&self, depth: usize) -> Result<Self::Query> {
        let mut query = self
            .audit_queryable(TypeId::of::<M>())
            .ok_or_else(|| AuditError::QuerySourceNotFound(type_name::<M>().to_string()))?;
        for path in self.include_paths_with_depth::<M>(depth)?.iter() {
            query = self.apply_eager_load(query, path);
        }
        Ok(query)
    }
}

impl<C: AuditContext + ?Sized> AuditContextExt for C {}
