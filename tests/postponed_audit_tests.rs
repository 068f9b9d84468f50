/// Postponed audit pipeline tests
///
/// Cover intent ordering, the no-op empty finalize, the Pending ->
/// Finalized state machine, fail-fast propagation and the end-to-end
/// scenario from postpone to bulk insert.
/// Run with: cargo test --test postponed_audit_tests
use async_trait::async_trait;
use auditrail::{
    ActionKind, AuditContext, AuditContextExt, AuditError, AuditResult, Auditable, EntityType,
    KeyProperty, MetadataModel, MetadataRegistry, PostponedAuditManager, Result,
    StandardActionFactory, StandardAuditAction,
};
use serde_json::{Value, json};
use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Change {
    Create,
    Update,
    Delete,
}

impl ActionKind for Change {}

struct Order {
    id: i64,
}

struct Customer {
    id: i64,
}

/// Record body produced by the fake diff capability; the action slot
/// is filled by the finalize pipeline.
struct ChangeRecord {
    snapshot: String,
    action: Option<StandardAuditAction<Change>>,
}

impl AuditResult<StandardAuditAction<Change>> for ChangeRecord {
    fn set_action(&mut self, action: StandardAuditAction<Change>) {
        self.action = Some(action);
    }
}

/// Fake unit-of-work context with counters on every collaborator call.
struct AuditLog {
    model: MetadataRegistry,
    audits: AtomicUsize,
    inserts: AtomicUsize,
    inserted: Mutex<Vec<ChangeRecord>>,
    fail_on_order: Option<i64>,
}

impl AuditLog {
    fn new() -> Self {
        Self {
            model: MetadataRegistry::new()
                .with_entity(
                    EntityType::new::<Order>("Order")
                        .with_key(["id"])
                        .with_navigation::<Customer>("Customer"),
                )
                .unwrap()
                .with_entity(
                    EntityType::new::<Customer>("Customer")
                        .with_key(["id"])
                        .with_cycle_prevented_navigation::<Order>("Orders"),
                )
                .unwrap(),
            audits: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            inserted: Mutex::new(Vec::new()),
            fail_on_order: None,
        }
    }

    fn failing_on_order(id: i64) -> Self {
        Self {
            fail_on_order: Some(id),
            ..Self::new()
        }
    }

    fn inserted(&self) -> std::sync::MutexGuard<'_, Vec<ChangeRecord>> {
        self.inserted.lock().unwrap()
    }
}

#[async_trait]
impl AuditContext for AuditLog {
    type Kind = Change;
    type Action = StandardAuditAction<Change>;
    type Record = ChangeRecord;
    type Query = Vec<String>;

    fn model(&self) -> &dyn MetadataModel {
        &self.model
    }

    fn read_current(&self, instance: &dyn Any, property: &KeyProperty) -> Option<Value> {
        if property.name() != "id" {
            return None;
        }
        if let Some(order) = instance.downcast_ref::<Order>() {
            return Some(Value::from(order.id));
        }
        instance
            .downcast_ref::<Customer>()
            .map(|customer| Value::from(customer.id))
    }

    async fn bulk_insert(&self, records: Vec<ChangeRecord>) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inserted.lock().unwrap().extend(records);
        Ok(())
    }

    fn audit_queryable(&self, _type_id: TypeId) -> Option<Vec<String>> {
        Some(Vec::new())
    }

    fn apply_eager_load(&self, mut query: Vec<String>, path: &str) -> Vec<String> {
        query.push(path.to_string());
        query
    }
}

#[async_trait]
impl Auditable<AuditLog> for Order {
    async fn audit(&self, context: &AuditLog) -> Result<ChangeRecord> {
        context.audits.fetch_add(1, Ordering::SeqCst);
        if context.fail_on_order == Some(self.id) {
            return Err(AuditError::External(
                format!("diff failed for order {}", self.id).into(),
            ));
        }
        Ok(ChangeRecord {
            snapshot: format!("order:{}", self.id),
            action: None,
        })
    }
}

#[async_trait]
impl Auditable<AuditLog> for Customer {
    async fn audit(&self, context: &AuditLog) -> Result<ChangeRecord> {
        context.audits.fetch_add(1, Ordering::SeqCst);
        Ok(ChangeRecord {
            snapshot: format!("customer:{}", self.id),
            action: None,
        })
    }
}

fn manager() -> PostponedAuditManager<AuditLog> {
    PostponedAuditManager::new(Arc::new(StandardActionFactory::<Change>::new()))
}

#[tokio::test]
async fn empty_storage_is_a_no_op() {
    let context = AuditLog::new();
    let mut audits = manager();
    audits.storage::<Order>();

    audits.execute_and_dispose(&context).await.unwrap();

    assert_eq!(context.audits.load(Ordering::SeqCst), 0);
    assert_eq!(context.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn intents_are_materialized_in_insertion_order() {
    let context = AuditLog::new();
    let mut audits = manager();

    audits.postpone(Arc::new(Order { id: 1 }), Change::Create).unwrap();
    audits.postpone(Arc::new(Order { id: 2 }), Change::Update).unwrap();
    audits.postpone(Arc::new(Order { id: 3 }), Change::Delete).unwrap();
    assert_eq!(audits.pending_len(), 3);

    audits.execute_and_dispose(&context).await.unwrap();

    let inserted = context.inserted();
    let kinds: Vec<Change> = inserted
        .iter()
        .map(|record| record.action.as_ref().unwrap().kind)
        .collect();
    assert_eq!(kinds, vec![Change::Create, Change::Update, Change::Delete]);
    assert_eq!(inserted[0].snapshot, "order:1");
    assert_eq!(inserted[2].snapshot, "order:3");
    assert_eq!(context.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn end_to_end_postponed_update() {
    let context = AuditLog::new();

    // The relationship graph yields exactly the safe eager-load path.
    let paths = context.include_paths::<Order>().unwrap();
    assert_eq!(*paths, vec!["Customer".to_string()]);
    assert!(context.include_paths::<Customer>().unwrap().is_empty());

    let order = Arc::new(Order { id: 5 });
    let expected_id = context.audit_entity_id(order.as_ref()).unwrap();
    assert_eq!(expected_id, r#"["5"]"#);

    let mut audits = manager();
    audits.postpone(Arc::clone(&order), Change::Update).unwrap();
    audits.execute_and_dispose(&context).await.unwrap();

    let inserted = context.inserted();
    assert_eq!(inserted.len(), 1);
    let action = inserted[0].action.as_ref().unwrap();
    assert_eq!(action.kind, Change::Update);
    assert_eq!(action.entity_id, expected_id);
    assert_eq!(action.kind_name(), "Update");
    assert_eq!(inserted[0].snapshot, "order:5");
}

#[tokio::test]
async fn additional_payload_is_carried_through() {
    let context = AuditLog::new();
    let mut audits = manager();

    audits
        .postpone_with(Arc::new(Order { id: 9 }), Change::Delete, json!({"reason": "gdpr"}))
        .unwrap();
    audits.execute_and_dispose(&context).await.unwrap();

    let inserted = context.inserted();
    let action = inserted[0].action.as_ref().unwrap();
    assert_eq!(action.additional, Some(json!({"reason": "gdpr"})));
}

#[tokio::test]
async fn postpone_range_shares_kind_and_payload() {
    let context = AuditLog::new();
    let mut audits = manager();

    audits
        .storage::<Order>()
        .postpone_range(
            vec![Arc::new(Order { id: 1 }), Arc::new(Order { id: 2 })],
            Change::Create,
            Some(json!("bulk-import")),
        )
        .unwrap();
    audits.execute_and_dispose(&context).await.unwrap();

    let inserted = context.inserted();
    assert_eq!(inserted.len(), 2);
    for record in inserted.iter() {
        let action = record.action.as_ref().unwrap();
        assert_eq!(action.kind, Change::Create);
        assert_eq!(action.additional, Some(json!("bulk-import")));
    }
}

#[tokio::test]
async fn storages_execute_in_registration_order() {
    let context = AuditLog::new();
    let mut audits = manager();

    // Customer intents registered before Order intents.
    audits.postpone(Arc::new(Customer { id: 7 }), Change::Update).unwrap();
    audits.postpone(Arc::new(Order { id: 8 }), Change::Update).unwrap();
    assert_eq!(audits.storage_count(), 2);

    audits.execute_and_dispose(&context).await.unwrap();

    let inserted = context.inserted();
    assert_eq!(inserted[0].snapshot, "customer:7");
    assert_eq!(inserted[1].snapshot, "order:8");
    // One bulk insert per storage.
    assert_eq!(context.inserts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn second_finalize_fails_loudly() {
    let context = AuditLog::new();
    let mut audits = manager();
    audits.postpone(Arc::new(Order { id: 1 }), Change::Create).unwrap();

    let storage = audits.storage::<Order>();
    storage.plan_perform_actions(&context).await.unwrap();
    assert!(storage.is_finalized());

    let err = storage.plan_perform_actions(&context).await.unwrap_err();
    assert!(matches!(err, AuditError::AlreadyFinalized(_)));

    let err = storage
        .postpone(Arc::new(Order { id: 2 }), Change::Create, None)
        .unwrap_err();
    assert!(matches!(err, AuditError::AlreadyFinalized(_)));

    // No duplicate records were produced by the rejected second run.
    assert_eq!(context.inserted().len(), 1);
    assert_eq!(context.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failure_aborts_remaining_intents_and_skips_insert() {
    let context = AuditLog::failing_on_order(2);
    let mut audits = manager();

    audits.postpone(Arc::new(Order { id: 1 }), Change::Create).unwrap();
    audits.postpone(Arc::new(Order { id: 2 }), Change::Update).unwrap();
    audits.postpone(Arc::new(Order { id: 3 }), Change::Delete).unwrap();

    let err = audits.execute_and_dispose(&context).await.unwrap_err();
    assert!(matches!(err, AuditError::External(_)));

    // The third intent was never diffed and nothing reached the
    // pending-write set.
    assert_eq!(context.audits.load(Ordering::SeqCst), 2);
    assert_eq!(context.inserts.load(Ordering::SeqCst), 0);
    assert!(context.inserted().is_empty());
}

#[tokio::test]
async fn detached_execution_surfaces_the_outcome() {
    let context = Arc::new(AuditLog::new());
    let mut audits = manager();
    audits.postpone(Arc::new(Order { id: 4 }), Change::Create).unwrap();

    let handle = audits.execute_detached(Arc::clone(&context));
    handle.await.unwrap().unwrap();

    assert_eq!(context.inserted().len(), 1);

    let mut failing = manager();
    let failing_context = Arc::new(AuditLog::failing_on_order(6));
    failing.postpone(Arc::new(Order { id: 6 }), Change::Update).unwrap();

    let handle = failing.execute_detached(Arc::clone(&failing_context));
    let outcome = handle.await.unwrap();
    assert!(matches!(outcome, Err(AuditError::External(_))));
    assert!(failing_context.inserted().is_empty());
}
