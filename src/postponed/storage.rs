use serde_json::Value;
use std::any::type_name;
use std::sync::Arc;
use tracing::debug;

use crate::context::{AuditContext, AuditContextExt, Auditable};
use crate::core::{ActionFactory, AuditError, AuditResult, Result};

/// One recorded intent: audit this model instance with this action
/// kind. Immutable after creation, consumed exactly once at finalize.
struct PostponedModelData<M, K> {
    model: Arc<M>,
    kind: K,
    additional: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageState {
    Pending,
    Finalized,
}

/// Per-unit-of-work accumulator of postponed audit intents for one
/// model type.
///
/// Intents pile up in insertion order while business logic runs; at
/// finalize time each one is materialized (diff, identifier, action
/// metadata) and the whole batch joins the context's pending writes.
/// Finalize is valid exactly once: the storage transitions from
/// `Pending` to `Finalized` and every later call - postpone or
/// finalize - fails loudly instead of silently duplicating or
/// dropping records.
pub struct PostponedAuditStorage<M, C: AuditContext> {
    factory: Arc<dyn ActionFactory<C::Kind, Action = C::Action>>,
    pending: Vec<PostponedModelData<M, C::Kind>>,
    state: StorageState,
}

impl<M, C> PostponedAuditStorage<M, C>
where
    M: Auditable<C>,
    C: AuditContext,
{
    pub fn new(factory: Arc<dyn ActionFactory<C::Kind, Action = C::Action>>) -> Self {
        Self {
            factory,
            pending: Vec::new(),
            state: StorageState::Pending,
        }
    }

    /// Record one intent against this storage.
    pub fn postpone(
        &mut self,
        model: Arc<M>,
        kind: C::Kind,
        additional: Option<Value>,
    ) -> Result<()> {
        self.ensure_pending()?;
        self.pending.push(PostponedModelData {
            model,
            kind,
            additional,
        });
        Ok(())
    }

    /// Record one intent per model, all sharing the same kind and
    /// payload.
    pub fn postpone_range<I>(
        &mut self,
        models: I,
        kind: C::Kind,
        additional: Option<Value>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Arc<M>>,
    {
        self.ensure_pending()?;
        self.pending
            .extend(models.into_iter().map(|model| PostponedModelData {
                model,
                kind,
                additional: additional.clone(),
            }));
        Ok(())
    }

    /// Materialize every pending intent in insertion order and hand the
    /// batch to the context's pending-write set.
    ///
    /// Transitions to `Finalized` up front, so a second call fails with
    /// [`AuditError::AlreadyFinalized`] rather than duplicating
    /// records. An empty pending list is a complete no-op with zero
    /// context interaction. Any intent failure aborts the remaining
    /// intents and skips the bulk insert.
    pub async fn plan_perform_actions(&mut self, context: &C) -> Result<()> {
        self.ensure_pending()?;
        self.state = StorageState::Finalized;

        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        debug!(
            model = type_name::<M>(),
            count = pending.len(),
            "materializing postponed audit records"
        );

        let mut records: Vec<C::Record> = Vec::with_capacity(pending.len());
        for intent in pending {
            let mut record = intent.model.audit(context).await?;
            let entity_id = context.audit_entity_id(intent.model.as_ref())?;
            let action = self
                .factory
                .create_action(intent.kind, entity_id, intent.additional);
            record.set_action(action);
            records.push(record);
        }

        context.bulk_insert(records).await
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.state == StorageState::Finalized
    }

    fn ensure_pending(&self) -> Result<()> {
        match self.state {
            StorageState::Pending => Ok(()),
            StorageState::Finalized => Err(AuditError::AlreadyFinalized(type_name::<M>())),
        }
    }
}
