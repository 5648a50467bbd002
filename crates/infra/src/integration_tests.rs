//! Integration tests for the full inventory pipeline.
//!
//! Ledger commit → batch quantity → derived state → rule evaluation → alert.
//!
//! Verifies:
//! - quantity conservation and the non-negative invariant under concurrency
//! - status boundaries and expiry classification
//! - idempotent evaluation (duplicate suppression) and re-trigger after resolve
//! - clinic isolation across every service path

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use medtrack_alerts::{Alert, AlertRule, AlertStatus, Channel, RuleKind, RuleScope, Severity};
use medtrack_core::{ClinicId, DomainError, RecordId, StaffId};
use medtrack_inventory::{
    Adjustment, AdjustmentId, AdjustmentKind, Batch, BatchId, Item, RecordAdjustment, StockStatus,
};

use crate::catalog::CatalogService;
use crate::dispatch::NotificationDispatch;
use crate::error::ServiceError;
use crate::evaluator::AlertEvaluator;
use crate::ledger::LedgerService;
use crate::stock::StockService;
use crate::store::{InMemoryStore, InventoryStore, StoreError};

/// Dispatch stub that records every hand-off.
#[derive(Debug, Default)]
struct RecordingDispatch {
    delivered: Mutex<Vec<(Alert, AlertRule)>>,
}

impl RecordingDispatch {
    fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl NotificationDispatch for RecordingDispatch {
    fn deliver(&self, alert: &Alert, rule: &AlertRule) {
        self.delivered
            .lock()
            .unwrap()
            .push((alert.clone(), rule.clone()));
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    catalog: CatalogService<Arc<InMemoryStore>>,
    ledger: LedgerService<Arc<InMemoryStore>>,
    stock: StockService<Arc<InMemoryStore>>,
    evaluator: AlertEvaluator<Arc<InMemoryStore>, Arc<RecordingDispatch>>,
    dispatch: Arc<RecordingDispatch>,
    clinic_id: ClinicId,
    actor_id: StaffId,
}

fn setup() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let dispatch = Arc::new(RecordingDispatch::default());
    Harness {
        catalog: CatalogService::new(store.clone()),
        ledger: LedgerService::new(store.clone()),
        stock: StockService::new(store.clone()),
        evaluator: AlertEvaluator::new(store.clone(), dispatch.clone()),
        store,
        dispatch,
        clinic_id: ClinicId::new(),
        actor_id: StaffId::new(),
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn in_days(days: i64) -> NaiveDate {
    (Utc::now() + Duration::days(days)).date_naive()
}

impl Harness {
    fn register_item(&self, name: &str, threshold: i64) -> Item {
        self.catalog
            .register_item(self.clinic_id, name, "tablet", threshold)
            .unwrap()
    }

    fn low_stock_rule(&self) -> AlertRule {
        self.evaluator
            .register_rule(
                self.clinic_id,
                RuleScope::Clinic,
                RuleKind::LowStock,
                None,
                vec![Channel::Email],
                vec!["pharmacist@clinic.example".to_string()],
            )
            .unwrap()
    }
}

#[test]
fn receive_then_dispense_reports_in_stock() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);

    let (batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            100,
            "initial shipment",
            h.actor_id,
            now(),
        )
        .unwrap();
    assert_eq!(batch.quantity(), 100);

    h.ledger
        .dispense(
            h.clinic_id,
            item.id_typed(),
            batch.id_typed(),
            30,
            "rx 4711",
            h.actor_id,
            now(),
        )
        .unwrap();

    let state = h.stock.item_state(h.clinic_id, item.id_typed()).unwrap();
    assert_eq!(state.total_quantity, 70);
    assert_eq!(state.status, StockStatus::InStock);

    // Conservation: ledger deltas sum to the batch quantity.
    let history = h.ledger.batch_history(h.clinic_id, batch.id_typed()).unwrap();
    let sum: i64 = history.iter().map(|a| a.delta()).sum();
    let stored = h.store.batch(h.clinic_id, batch.id_typed()).unwrap().unwrap();
    assert_eq!(sum, stored.quantity());
    assert_eq!(sum, 70);
}

#[test]
fn drain_to_low_stock_creates_exactly_one_alert() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);
    let (batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            100,
            "initial shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    for qty in [30, 55] {
        h.ledger
            .dispense(
                h.clinic_id,
                item.id_typed(),
                batch.id_typed(),
                qty,
                "rx",
                h.actor_id,
                now(),
            )
            .unwrap();
    }

    let state = h.stock.item_state(h.clinic_id, item.id_typed()).unwrap();
    assert_eq!(state.total_quantity, 15);
    assert_eq!(state.status, StockStatus::LowStock);

    let rule = h.low_stock_rule();
    let created = h
        .evaluator
        .evaluate_rule(h.clinic_id, rule.id_typed(), now())
        .unwrap();
    assert_eq!(created.len(), 1);
    let alert = &created[0];
    assert_eq!(alert.severity(), Severity::Medium);
    assert_eq!(alert.status(), AlertStatus::Open);
    assert_eq!(alert.snapshot().quantity, Some(15));
    assert_eq!(h.dispatch.count(), 1);

    // Second evaluation with no state change: suppressed, nothing new.
    let repeat = h
        .evaluator
        .evaluate_rule(h.clinic_id, rule.id_typed(), now())
        .unwrap();
    assert!(repeat.is_empty());
    assert_eq!(h.evaluator.alerts(h.clinic_id).unwrap().len(), 1);
    assert_eq!(h.dispatch.count(), 1);
}

#[test]
fn over_dispense_is_rejected_without_state_change() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);
    let (batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            15,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();
    let rows_before = h.ledger.batch_history(h.clinic_id, batch.id_typed()).unwrap().len();

    let err = h
        .ledger
        .dispense(
            h.clinic_id,
            item.id_typed(),
            batch.id_typed(),
            1000,
            "rx",
            h.actor_id,
            now(),
        )
        .unwrap_err();
    match err {
        ServiceError::Domain(DomainError::InsufficientStock {
            requested,
            available,
        }) => {
            assert_eq!(requested, 1000);
            assert_eq!(available, 15);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    // No ledger row, no quantity change.
    let stored = h.store.batch(h.clinic_id, batch.id_typed()).unwrap().unwrap();
    assert_eq!(stored.quantity(), 15);
    let rows_after = h.ledger.batch_history(h.clinic_id, batch.id_typed()).unwrap().len();
    assert_eq!(rows_before, rows_after);
}

#[test]
fn resolving_an_alert_reopens_eligibility() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);
    h.ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            5,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    let rule = h.low_stock_rule();
    let first = h
        .evaluator
        .evaluate_rule(h.clinic_id, rule.id_typed(), now())
        .unwrap();
    assert_eq!(first.len(), 1);

    // Reading alone does not reopen eligibility.
    let read = h
        .evaluator
        .mark_read(h.clinic_id, first[0].id_typed())
        .unwrap();
    assert_eq!(read.status(), AlertStatus::Read);
    assert!(h
        .evaluator
        .evaluate_rule(h.clinic_id, rule.id_typed(), now())
        .unwrap()
        .is_empty());

    // Resolution does.
    let resolved = h
        .evaluator
        .resolve(h.clinic_id, first[0].id_typed(), now())
        .unwrap();
    assert!(resolved.is_resolved());
    assert!(resolved.is_read());

    let second = h
        .evaluator
        .evaluate_rule(h.clinic_id, rule.id_typed(), now())
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(h.evaluator.alerts(h.clinic_id).unwrap().len(), 2);
    assert_eq!(h.evaluator.unresolved_alerts(h.clinic_id).unwrap().len(), 1);
}

#[test]
fn duplicate_lot_number_per_item_conflicts() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);
    h.ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            10,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    let err = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            10,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::Conflict(_))
    ));

    // The rejected receipt left no second batch and no ledger row.
    assert_eq!(h.stock.batches(h.clinic_id, item.id_typed()).unwrap().len(), 1);
    assert_eq!(h.ledger.item_history(h.clinic_id, item.id_typed()).unwrap().len(), 1);

    // Same lot on a different item is fine.
    let other = h.register_item("Ibuprofen 400mg", 10);
    h.ledger
        .receive(
            h.clinic_id,
            other.id_typed(),
            "LOT-001",
            None,
            10,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();
}

#[test]
fn failed_receipt_commit_leaves_no_batch_behind() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);

    let batch = Batch::new(
        BatchId::new(RecordId::new()),
        item.id_typed(),
        "LOT-A",
        None,
        now(),
    )
    .unwrap();
    let other = Batch::new(
        BatchId::new(RecordId::new()),
        item.id_typed(),
        "LOT-B",
        None,
        now(),
    )
    .unwrap();
    let cmd = RecordAdjustment {
        clinic_id: h.clinic_id,
        item_id: item.id_typed(),
        batch_id: Some(other.id_typed()),
        kind: AdjustmentKind::Receive,
        delta: 10,
        reason: "shipment".to_string(),
        actor_id: h.actor_id,
        occurred_at: now(),
    };
    let adjustment =
        Adjustment::record(AdjustmentId::new(RecordId::new()), &item, Some(&other), &cmd).unwrap();

    // Opening entry targets a different batch: the commit must reject it
    // and store neither the batch nor the ledger row.
    let err = h
        .store
        .commit_receipt(h.clinic_id, batch.clone(), adjustment)
        .unwrap_err();
    assert!(matches!(err, StoreError::Integrity(_)));
    assert!(h.store.batch(h.clinic_id, batch.id_typed()).unwrap().is_none());
    assert!(h
        .ledger
        .item_history(h.clinic_id, item.id_typed())
        .unwrap()
        .is_empty());
}

#[test]
fn clinic_isolation_hides_foreign_rows() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);
    let (batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            50,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    let other_clinic = ClinicId::new();
    let err = h.stock.item_state(other_clinic, item.id_typed()).unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));

    let err = h
        .ledger
        .dispense(
            other_clinic,
            item.id_typed(),
            batch.id_typed(),
            1,
            "rx",
            h.actor_id,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));
}

#[test]
fn deactivated_item_behaves_as_missing() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 20);
    let (batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            5,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    h.catalog
        .deactivate_item(h.clinic_id, item.id_typed())
        .unwrap();

    let err = h.stock.item_state(h.clinic_id, item.id_typed()).unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));

    let err = h
        .ledger
        .dispense(
            h.clinic_id,
            item.id_typed(),
            batch.id_typed(),
            1,
            "rx",
            h.actor_id,
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));

    // The rule walk skips it instead of failing.
    h.low_stock_rule();
    assert!(h.evaluator.evaluate_all(h.clinic_id, now()).unwrap().is_empty());
}

#[test]
fn expiry_rules_via_evaluate_all() {
    let h = setup();
    let item = h.register_item("Insulin glargine", 2);
    h.ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-SOON",
            Some(in_days(10)),
            40,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();
    let (expired_batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-OLD",
            Some(in_days(-3)),
            8,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    h.evaluator
        .register_rule(
            h.clinic_id,
            RuleScope::Clinic,
            RuleKind::ExpiringSoon,
            Some(30),
            vec![Channel::InApp],
            vec![],
        )
        .unwrap();
    h.evaluator
        .register_rule(
            h.clinic_id,
            RuleScope::Item(item.id_typed()),
            RuleKind::Expired,
            None,
            vec![Channel::Email],
            vec!["pharmacist@clinic.example".to_string()],
        )
        .unwrap();

    let created = h.evaluator.evaluate_all(h.clinic_id, now()).unwrap();
    let mut kinds: Vec<RuleKind> = created.iter().map(|a| a.kind()).collect();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(kinds, vec![RuleKind::Expired, RuleKind::ExpiringSoon]);

    let expired = created
        .iter()
        .find(|a| a.kind() == RuleKind::Expired)
        .unwrap();
    assert_eq!(expired.severity(), Severity::High);
    assert_eq!(expired.snapshot().quantity, Some(8));
    assert_eq!(expired.snapshot().expiry, Some(in_days(-3)));

    // Write off the expired lot; with the batch drained, the condition is
    // gone and (after resolving) no new expired alert appears.
    h.ledger
        .write_off_expired(h.clinic_id, expired_batch.id_typed(), h.actor_id, now())
        .unwrap();
    h.evaluator
        .resolve(h.clinic_id, expired.id_typed(), now())
        .unwrap();

    let again = h.evaluator.evaluate_all(h.clinic_id, now()).unwrap();
    assert!(again.iter().all(|a| a.kind() != RuleKind::Expired));
}

#[test]
fn item_level_correction_touches_no_batch() {
    let h = setup();
    let item = h.register_item("Gauze pads", 10);
    let (batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            30,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    h.ledger
        .apply(RecordAdjustment {
            clinic_id: h.clinic_id,
            item_id: item.id_typed(),
            batch_id: None,
            kind: AdjustmentKind::Correction,
            delta: -2,
            reason: "count reconciliation note".to_string(),
            actor_id: h.actor_id,
            occurred_at: now(),
        })
        .unwrap();

    // Batch quantity untouched; the row shows up in the item trail only.
    let stored = h.store.batch(h.clinic_id, batch.id_typed()).unwrap().unwrap();
    assert_eq!(stored.quantity(), 30);
    assert_eq!(h.ledger.batch_history(h.clinic_id, batch.id_typed()).unwrap().len(), 1);
    assert_eq!(h.ledger.item_history(h.clinic_id, item.id_typed()).unwrap().len(), 2);
}

#[test]
fn concurrent_dispenses_against_one_batch_serialize() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 0);
    let (batch, _) = h
        .ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            50,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    let successes = Mutex::new(0usize);
    std::thread::scope(|scope| {
        for _ in 0..10 {
            scope.spawn(|| {
                let result = h.ledger.dispense(
                    h.clinic_id,
                    item.id_typed(),
                    batch.id_typed(),
                    10,
                    "rx",
                    h.actor_id,
                    now(),
                );
                match result {
                    Ok(_) => *successes.lock().unwrap() += 1,
                    Err(err) => assert!(matches!(
                        err,
                        ServiceError::Domain(DomainError::InsufficientStock { .. })
                    )),
                }
            });
        }
    });

    // Exactly five 10-unit dispenses fit into 50; the rest lose the race.
    assert_eq!(*successes.lock().unwrap(), 5);
    let stored = h.store.batch(h.clinic_id, batch.id_typed()).unwrap().unwrap();
    assert_eq!(stored.quantity(), 0);

    let history = h.ledger.batch_history(h.clinic_id, batch.id_typed()).unwrap();
    let sum: i64 = history.iter().map(|a| a.delta()).sum();
    assert_eq!(sum, 0);
    assert_eq!(history.len(), 6);
}

#[test]
fn disabled_rule_is_skipped() {
    let h = setup();
    h.register_item("Amoxicillin 500mg", 20);
    let rule = h.low_stock_rule();
    h.evaluator
        .disable_rule(h.clinic_id, rule.id_typed())
        .unwrap();

    assert!(h
        .evaluator
        .evaluate_rule(h.clinic_id, rule.id_typed(), now())
        .unwrap()
        .is_empty());
    assert!(h.evaluator.evaluate_all(h.clinic_id, now()).unwrap().is_empty());
}

#[test]
fn threshold_update_shifts_classification() {
    let h = setup();
    let item = h.register_item("Amoxicillin 500mg", 10);
    h.ledger
        .receive(
            h.clinic_id,
            item.id_typed(),
            "LOT-001",
            None,
            15,
            "shipment",
            h.actor_id,
            now(),
        )
        .unwrap();

    assert_eq!(
        h.stock.item_state(h.clinic_id, item.id_typed()).unwrap().status,
        StockStatus::InStock
    );

    h.catalog
        .set_low_stock_threshold(h.clinic_id, item.id_typed(), 15)
        .unwrap();
    assert_eq!(
        h.stock.item_state(h.clinic_id, item.id_typed()).unwrap().status,
        StockStatus::LowStock
    );
}
