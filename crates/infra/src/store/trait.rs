use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use medtrack_alerts::{Alert, AlertId, AlertRule, RuleId, RuleKind};
use medtrack_core::ClinicId;
use medtrack_inventory::{Adjustment, Batch, BatchId, Item, ItemId};

/// Storage operation error.
///
/// Infrastructure failures (uniqueness, integrity, availability) as opposed
/// to domain failures. `Transient` marks faults the caller may retry from
/// scratch (lock contention, connection loss); everything else is final.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation (e.g. duplicate lot number per item).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The atomic commit re-check found less stock than the delta requires.
    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity { requested: i64, available: i64 },

    /// Referenced row missing, or not visible to the caller's clinic.
    #[error("not found")]
    NotFound,

    /// Cross-entity integrity violation (e.g. adjustment batch not owned by
    /// the adjustment's item).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Retryable storage fault (lock poisoning, connection loss).
    #[error("transient storage failure: {0}")]
    Transient(String),
}

/// Store for items, batches, and the append-only adjustment ledger.
///
/// Implementations must enforce clinic isolation on every operation (reads
/// off-clinic behave as if the row does not exist) and must make
/// `commit_adjustment` atomic: ledger insert and batch quantity update both
/// happen or neither does, and concurrent commits against the same batch
/// serialize so the non-negative-quantity invariant holds.
pub trait InventoryStore: Send + Sync {
    fn insert_item(&self, item: Item) -> Result<(), StoreError>;

    fn item(&self, clinic_id: ClinicId, item_id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Active items for a clinic.
    fn list_items(&self, clinic_id: ClinicId) -> Result<Vec<Item>, StoreError>;

    /// Replace a stored item (lifecycle/threshold changes).
    fn update_item(&self, clinic_id: ClinicId, item: Item) -> Result<(), StoreError>;

    /// Atomically insert a new batch together with its opening Receive
    /// entry: both land or neither does, so no empty batch can linger after
    /// a failed receipt. Fails with `Conflict` when the lot number is
    /// already used for the owning item, `NotFound` when the item is
    /// missing. Returns the batch with the opening quantity applied.
    fn commit_receipt(
        &self,
        clinic_id: ClinicId,
        batch: Batch,
        adjustment: Adjustment,
    ) -> Result<Batch, StoreError>;

    fn batch(&self, clinic_id: ClinicId, batch_id: BatchId) -> Result<Option<Batch>, StoreError>;

    /// All batches of an item, drained ones included (history stays queryable).
    fn batches_for_item(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Vec<Batch>, StoreError>;

    /// Atomically append the ledger row and apply its delta to the target
    /// batch. The quantity guard is re-checked under the store's exclusive
    /// section; a losing racer gets `InsufficientQuantity` and no state
    /// change. Item-level rows (no batch) only append.
    fn commit_adjustment(&self, adjustment: Adjustment) -> Result<Adjustment, StoreError>;

    fn adjustments_for_batch(
        &self,
        clinic_id: ClinicId,
        batch_id: BatchId,
    ) -> Result<Vec<Adjustment>, StoreError>;

    fn adjustments_for_item(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Vec<Adjustment>, StoreError>;
}

/// Store for alert rules and materialized alerts.
pub trait AlertStore: Send + Sync {
    fn insert_rule(&self, rule: AlertRule) -> Result<(), StoreError>;

    fn rule(&self, clinic_id: ClinicId, rule_id: RuleId) -> Result<Option<AlertRule>, StoreError>;

    fn active_rules(&self, clinic_id: ClinicId) -> Result<Vec<AlertRule>, StoreError>;

    fn update_rule(&self, clinic_id: ClinicId, rule: AlertRule) -> Result<(), StoreError>;

    fn insert_alert(&self, alert: Alert) -> Result<(), StoreError>;

    fn alerts(&self, clinic_id: ClinicId) -> Result<Vec<Alert>, StoreError>;

    /// The unresolved alert for a rule + item + kind combination, if any.
    /// This lookup backs duplicate suppression.
    fn open_alert(
        &self,
        clinic_id: ClinicId,
        rule_id: RuleId,
        item_id: Option<ItemId>,
        kind: RuleKind,
    ) -> Result<Option<Alert>, StoreError>;

    fn mark_alert_read(&self, clinic_id: ClinicId, alert_id: AlertId)
        -> Result<Alert, StoreError>;

    /// Resolve atomically force-sets read; returns the updated alert.
    fn resolve_alert(
        &self,
        clinic_id: ClinicId,
        alert_id: AlertId,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        (**self).insert_item(item)
    }

    fn item(&self, clinic_id: ClinicId, item_id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).item(clinic_id, item_id)
    }

    fn list_items(&self, clinic_id: ClinicId) -> Result<Vec<Item>, StoreError> {
        (**self).list_items(clinic_id)
    }

    fn update_item(&self, clinic_id: ClinicId, item: Item) -> Result<(), StoreError> {
        (**self).update_item(clinic_id, item)
    }

    fn commit_receipt(
        &self,
        clinic_id: ClinicId,
        batch: Batch,
        adjustment: Adjustment,
    ) -> Result<Batch, StoreError> {
        (**self).commit_receipt(clinic_id, batch, adjustment)
    }

    fn batch(&self, clinic_id: ClinicId, batch_id: BatchId) -> Result<Option<Batch>, StoreError> {
        (**self).batch(clinic_id, batch_id)
    }

    fn batches_for_item(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Vec<Batch>, StoreError> {
        (**self).batches_for_item(clinic_id, item_id)
    }

    fn commit_adjustment(&self, adjustment: Adjustment) -> Result<Adjustment, StoreError> {
        (**self).commit_adjustment(adjustment)
    }

    fn adjustments_for_batch(
        &self,
        clinic_id: ClinicId,
        batch_id: BatchId,
    ) -> Result<Vec<Adjustment>, StoreError> {
        (**self).adjustments_for_batch(clinic_id, batch_id)
    }

    fn adjustments_for_item(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Vec<Adjustment>, StoreError> {
        (**self).adjustments_for_item(clinic_id, item_id)
    }
}

impl<S> AlertStore for Arc<S>
where
    S: AlertStore + ?Sized,
{
    fn insert_rule(&self, rule: AlertRule) -> Result<(), StoreError> {
        (**self).insert_rule(rule)
    }

    fn rule(&self, clinic_id: ClinicId, rule_id: RuleId) -> Result<Option<AlertRule>, StoreError> {
        (**self).rule(clinic_id, rule_id)
    }

    fn active_rules(&self, clinic_id: ClinicId) -> Result<Vec<AlertRule>, StoreError> {
        (**self).active_rules(clinic_id)
    }

    fn update_rule(&self, clinic_id: ClinicId, rule: AlertRule) -> Result<(), StoreError> {
        (**self).update_rule(clinic_id, rule)
    }

    fn insert_alert(&self, alert: Alert) -> Result<(), StoreError> {
        (**self).insert_alert(alert)
    }

    fn alerts(&self, clinic_id: ClinicId) -> Result<Vec<Alert>, StoreError> {
        (**self).alerts(clinic_id)
    }

    fn open_alert(
        &self,
        clinic_id: ClinicId,
        rule_id: RuleId,
        item_id: Option<ItemId>,
        kind: RuleKind,
    ) -> Result<Option<Alert>, StoreError> {
        (**self).open_alert(clinic_id, rule_id, item_id, kind)
    }

    fn mark_alert_read(
        &self,
        clinic_id: ClinicId,
        alert_id: AlertId,
    ) -> Result<Alert, StoreError> {
        (**self).mark_alert_read(clinic_id, alert_id)
    }

    fn resolve_alert(
        &self,
        clinic_id: ClinicId,
        alert_id: AlertId,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        (**self).resolve_alert(clinic_id, alert_id, at)
    }
}
