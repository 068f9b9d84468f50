use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

/// Closed set of audited action kinds for one deployment.
///
/// A deployment declares its own enum (`Create`, `Update`, `Delete`, ...)
/// and implements this trait on it. The display name defaults to the
/// `Debug` rendering; override it to plug in custom naming.
pub trait ActionKind: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    fn display_name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("{self:?}"))
    }
}

/// Builds action metadata from a kind, the serialized entity identifier
/// and an optional opaque payload supplied at postpone time.
pub trait ActionFactory<K: ActionKind>: Send + Sync {
    type Action: Send + 'static;

    fn create_action(&self, kind: K, entity_id: String, additional: Option<Value>) -> Self::Action;
}

/// Materialized audit record produced by the diffing collaborator.
///
/// The finalize pipeline attaches the action metadata after the record
/// itself has been produced, so the record type only needs a setter.
pub trait AuditResult<A>: Send + 'static {
    fn set_action(&mut self, action: A);
}

/// Ready-made action metadata: kind, entity identifier, payload and the
/// moment the action was materialized.
#[derive(Debug, Clone, Serialize)]
pub struct StandardAuditAction<K: ActionKind> {
    pub kind: K,
    pub entity_id: String,
    pub additional: Option<Value>,
    pub performed_at: DateTime<Utc>,
}

impl<K: ActionKind> StandardAuditAction<K> {
    pub fn kind_name(&self) -> Cow<'static, str> {
        self.kind.display_name()
    }
}

/// Factory producing [`StandardAuditAction`] values stamped with the
/// current UTC time.
pub struct StandardActionFactory<K>(PhantomData<K>);

impl<K> StandardActionFactory<K> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K> Default for StandardActionFactory<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ActionKind> ActionFactory<K> for StandardActionFactory<K> {
    type Action = StandardAuditAction<K>;

    fn create_action(&self, kind: K, entity_id: String, additional: Option<Value>) -> Self::Action {
        StandardAuditAction {
            kind,
            entity_id,
            additional,
            performed_at: Utc::now(),
        }
    }
}
