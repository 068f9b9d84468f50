use async_trait::async_trait;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::storage::PostponedAuditStorage;
use crate::context::{AuditContext, Auditable};
use crate::core::{ActionFactory, Result};

/// Type-erased view of one model type's storage, so the manager can
/// hold storages for any mix of model types in registration order.
#[async_trait]
trait ErasedStorage<C: AuditContext>: Send {
    async fn plan_perform_actions(&mut self, context: &C) -> Result<()>;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn pending_len(&self) -> usize;
}

#[async_trait]
impl<M, C> ErasedStorage<C> for PostponedAuditStorage<M, C>
where
    M: Auditable<C>,
    C: AuditContext + 'static,
{
    async fn plan_perform_actions(&mut self, context: &C) -> Result<()> {
        PostponedAuditStorage::plan_perform_actions(self, context).await
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pending_len(&self) -> usize {
        PostponedAuditStorage::pending_len(self)
    }
}

/// Owns the postponed audit storages of one unit of work.
///
/// One manager per concurrent unit of work, never shared, so no
/// internal locking. `execute_and_dispose` consumes the manager -
/// reuse after execution is a compile error, and each storage's
/// finalize runs exactly once, sequentially, in registration order.
pub struct PostponedAuditManager<C: AuditContext + 'static> {
    factory: Arc<dyn ActionFactory<C::Kind, Action = C::Action>>,
    storages: Vec<Box<dyn ErasedStorage<C>>>,
    index: HashMap<TypeId, usize>,
}

impl<C: AuditContext + 'static> PostponedAuditManager<C> {
    pub fn new(factory: Arc<dyn ActionFactory<C::Kind, Action = C::Action>>) -> Self {
        Self {
            factory,
            storages: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Storage for model type `M`, created on first use. Registration
    /// order is the order of first use and fixes execution order.
    pub fn storage<M>(&mut self) -> &mut PostponedAuditStorage<M, C>
    where
        M: Auditable<C>,
    {
        let storages = &mut self.storages;
        let factory = &self.factory;
        let position = *self.index.entry(TypeId::of::<M>()).or_insert_with(|| {
            storages.push(Box::new(PostponedAuditStorage::<M, C>::new(factory.clone())));
            storages.len() - 1
        });
        self.storages[position]
            .as_any_mut()
            .downcast_mut::<PostponedAuditStorage<M, C>>()
            .expect("storage registered under a different model type")
    }

    pub fn postpone<M>(&mut self, model: Arc<M>, kind: C::Kind) -> Result<()>
    where
        M: Auditable<C>,
    {
        self.storage::<M>().postpone(model, kind, None)
    }

    pub fn postpone_with<M>(&mut self, model: Arc<M>, kind: C::Kind, additional: Value) -> Result<()>
    where
        M: Auditable<C>,
    {
        self.storage::<M>().postpone(model, kind, Some(additional))
    }

    pub fn postpone_range<M, I>(&mut self, models: I, kind: C::Kind) -> Result<()>
    where
        M: Auditable<C>,
        I: IntoIterator<Item = Arc<M>>,
    {
        self.storage::<M>().postpone_range(models, kind, None)
    }

    /// Run every registered storage's finalize exactly once, in
    /// registration order, then release the manager. Fail-fast: the
    /// first storage failure aborts the remaining storages.
    ///
    /// The host invokes this once per unit of work, after business
    /// logic has saved (so generated identifiers are visible) and
    /// before the final commit.
    pub async fn execute_and_dispose(mut self, context: &C) -> Result<()> {
        debug!(
            storages = self.storages.len(),
            pending = self.pending_len(),
            "executing postponed audit storages"
        );
        for storage in &mut self.storages {
            storage.plan_perform_actions(context).await?;
        }
        Ok(())
    }

    /// Background variant of [`execute_and_dispose`] for trigger points
    /// that cannot await, e.g. the tail of a request pipeline. The
    /// returned handle makes the outcome observable; a failure is also
    /// logged here so even a dropped handle leaves a trace.
    ///
    /// [`execute_and_dispose`]: PostponedAuditManager::execute_and_dispose
    pub fn execute_detached(self, context: Arc<C>) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let result = self.execute_and_dispose(context.as_ref()).await;
            if let Err(err) = &result {
                error!(error = %err, "postponed audit execution failed");
            }
            result
        })
    }

    /// Total intents still pending across all storages.
    pub fn pending_len(&self) -> usize {
        self.storages.iter().map(|storage| storage.pending_len()).sum()
    }

    pub fn storage_count(&self) -> usize {
        self.storages.len()
    }
}
