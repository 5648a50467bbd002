use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use medtrack_alerts::{Alert, AlertId, AlertRule, RuleId, RuleKind};
use medtrack_core::{ClinicId, DomainError};
use medtrack_inventory::{Adjustment, Batch, BatchId, Item, ItemId};

use super::r#trait::{AlertStore, InventoryStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<(ClinicId, ItemId), Item>,
    batches: HashMap<(ClinicId, BatchId), Batch>,
    /// Append-only, in commit order per clinic.
    adjustments: HashMap<ClinicId, Vec<Adjustment>>,
    rules: HashMap<(ClinicId, RuleId), AlertRule>,
    alerts: HashMap<(ClinicId, AlertId), Alert>,
}

/// In-memory store.
///
/// Intended for tests/dev. All state sits behind one `RwLock`, so
/// `commit_adjustment` runs its check-then-update under the write lock and
/// concurrent commits against the same batch serialize, which is exactly the
/// transactional contract a relational backend provides with row locking.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Transient("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Transient("lock poisoned".to_string()))
    }
}

impl InventoryStore for InMemoryStore {
    fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let key = (item.clinic_id(), item.id_typed());
        if inner.items.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "item {} already exists",
                item.id_typed()
            )));
        }
        inner.items.insert(key, item);
        Ok(())
    }

    fn item(&self, clinic_id: ClinicId, item_id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.items.get(&(clinic_id, item_id)).cloned())
    }

    fn list_items(&self, clinic_id: ClinicId) -> Result<Vec<Item>, StoreError> {
        let inner = self.read()?;
        let mut items: Vec<Item> = inner
            .items
            .iter()
            .filter(|((clinic, _), item)| *clinic == clinic_id && item.is_active())
            .map(|(_, item)| item.clone())
            .collect();
        // Deterministic listing order.
        items.sort_by_key(|i| *i.id_typed().0.as_uuid().as_bytes());
        Ok(items)
    }

    fn update_item(&self, clinic_id: ClinicId, item: Item) -> Result<(), StoreError> {
        if item.clinic_id() != clinic_id {
            return Err(StoreError::NotFound);
        }
        let mut inner = self.write()?;
        let key = (clinic_id, item.id_typed());
        match inner.items.get_mut(&key) {
            Some(stored) => {
                *stored = item;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn commit_receipt(
        &self,
        clinic_id: ClinicId,
        mut batch: Batch,
        adjustment: Adjustment,
    ) -> Result<Batch, StoreError> {
        let mut inner = self.write()?;

        // Foreign-key integrity: the owning item must exist in this clinic.
        if !inner.items.contains_key(&(clinic_id, batch.item_id())) {
            return Err(StoreError::NotFound);
        }

        let key = (clinic_id, batch.id_typed());
        if inner.batches.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "batch {} already exists",
                batch.id_typed()
            )));
        }

        // Lot numbers are unique per item.
        let duplicate_lot = inner.batches.iter().any(|((clinic, _), existing)| {
            *clinic == clinic_id
                && existing.item_id() == batch.item_id()
                && existing.lot_number() == batch.lot_number()
        });
        if duplicate_lot {
            return Err(StoreError::Conflict(format!(
                "lot number '{}' already used for item {}",
                batch.lot_number(),
                batch.item_id()
            )));
        }

        if adjustment.clinic_id() != clinic_id || adjustment.item_id() != batch.item_id() {
            return Err(StoreError::Integrity(
                "opening entry does not match the received batch".to_string(),
            ));
        }
        // Everything validated; insert batch and ledger row together so a
        // failure above leaves neither behind.
        batch
            .apply(&adjustment)
            .map_err(|e| StoreError::Integrity(e.to_string()))?;

        inner.batches.insert(key, batch.clone());
        inner
            .adjustments
            .entry(clinic_id)
            .or_default()
            .push(adjustment);
        Ok(batch)
    }

    fn batch(&self, clinic_id: ClinicId, batch_id: BatchId) -> Result<Option<Batch>, StoreError> {
        Ok(self.read()?.batches.get(&(clinic_id, batch_id)).cloned())
    }

    fn batches_for_item(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Vec<Batch>, StoreError> {
        let inner = self.read()?;
        let mut batches: Vec<Batch> = inner
            .batches
            .iter()
            .filter(|((clinic, _), b)| *clinic == clinic_id && b.item_id() == item_id)
            .map(|(_, b)| b.clone())
            .collect();
        batches.sort_by_key(|b| *b.id_typed().0.as_uuid().as_bytes());
        Ok(batches)
    }

    fn commit_adjustment(&self, adjustment: Adjustment) -> Result<Adjustment, StoreError> {
        let mut inner = self.write()?;
        let clinic_id = adjustment.clinic_id();

        if !inner.items.contains_key(&(clinic_id, adjustment.item_id())) {
            return Err(StoreError::NotFound);
        }

        // Ledger insert + quantity update under one exclusive section:
        // both happen or neither does.
        if let Some(batch_id) = adjustment.batch_id() {
            let batch = inner
                .batches
                .get_mut(&(clinic_id, batch_id))
                .ok_or(StoreError::NotFound)?;
            if batch.item_id() != adjustment.item_id() {
                return Err(StoreError::Integrity(
                    "adjustment batch does not belong to adjustment item".to_string(),
                ));
            }

            // Authoritative re-check of the quantity guard; the service's
            // pre-check ran outside this lock and may have lost a race.
            batch.apply(&adjustment).map_err(|e| match e {
                DomainError::InsufficientStock {
                    requested,
                    available,
                } => StoreError::InsufficientQuantity {
                    requested,
                    available,
                },
                other => StoreError::Integrity(other.to_string()),
            })?;
        }

        inner
            .adjustments
            .entry(clinic_id)
            .or_default()
            .push(adjustment.clone());
        Ok(adjustment)
    }

    fn adjustments_for_batch(
        &self,
        clinic_id: ClinicId,
        batch_id: BatchId,
    ) -> Result<Vec<Adjustment>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .adjustments
            .get(&clinic_id)
            .map(|rows| {
                rows.iter()
                    .filter(|a| a.batch_id() == Some(batch_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn adjustments_for_item(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Vec<Adjustment>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .adjustments
            .get(&clinic_id)
            .map(|rows| {
                rows.iter()
                    .filter(|a| a.item_id() == item_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl AlertStore for InMemoryStore {
    fn insert_rule(&self, rule: AlertRule) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let key = (rule.clinic_id(), rule.id_typed());
        if inner.rules.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "rule {} already exists",
                rule.id_typed()
            )));
        }
        inner.rules.insert(key, rule);
        Ok(())
    }

    fn rule(&self, clinic_id: ClinicId, rule_id: RuleId) -> Result<Option<AlertRule>, StoreError> {
        Ok(self.read()?.rules.get(&(clinic_id, rule_id)).cloned())
    }

    fn active_rules(&self, clinic_id: ClinicId) -> Result<Vec<AlertRule>, StoreError> {
        let inner = self.read()?;
        let mut rules: Vec<AlertRule> = inner
            .rules
            .iter()
            .filter(|((clinic, _), rule)| *clinic == clinic_id && rule.is_active())
            .map(|(_, rule)| rule.clone())
            .collect();
        rules.sort_by_key(|r| *r.id_typed().0.as_uuid().as_bytes());
        Ok(rules)
    }

    fn update_rule(&self, clinic_id: ClinicId, rule: AlertRule) -> Result<(), StoreError> {
        if rule.clinic_id() != clinic_id {
            return Err(StoreError::NotFound);
        }
        let mut inner = self.write()?;
        let key = (clinic_id, rule.id_typed());
        match inner.rules.get_mut(&key) {
            Some(stored) => {
                *stored = rule;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn insert_alert(&self, alert: Alert) -> Result<(), StoreError> {
        let mut inner = self.write()?;

        // Foreign-key integrity: the rule must exist in this clinic.
        if !inner
            .rules
            .contains_key(&(alert.clinic_id(), alert.rule_id()))
        {
            return Err(StoreError::NotFound);
        }

        let key = (alert.clinic_id(), alert.id_typed());
        if inner.alerts.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "alert {} already exists",
                alert.id_typed()
            )));
        }
        inner.alerts.insert(key, alert);
        Ok(())
    }

    fn alerts(&self, clinic_id: ClinicId) -> Result<Vec<Alert>, StoreError> {
        let inner = self.read()?;
        let mut alerts: Vec<Alert> = inner
            .alerts
            .iter()
            .filter(|((clinic, _), _)| *clinic == clinic_id)
            .map(|(_, a)| a.clone())
            .collect();
        alerts.sort_by_key(|a| (a.created_at(), *a.id_typed().0.as_uuid().as_bytes()));
        Ok(alerts)
    }

    fn open_alert(
        &self,
        clinic_id: ClinicId,
        rule_id: RuleId,
        item_id: Option<ItemId>,
        kind: RuleKind,
    ) -> Result<Option<Alert>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .alerts
            .iter()
            .filter(|((clinic, _), _)| *clinic == clinic_id)
            .map(|(_, a)| a)
            .find(|a| a.suppresses(rule_id, item_id, kind))
            .cloned())
    }

    fn mark_alert_read(
        &self,
        clinic_id: ClinicId,
        alert_id: AlertId,
    ) -> Result<Alert, StoreError> {
        let mut inner = self.write()?;
        let alert = inner
            .alerts
            .get_mut(&(clinic_id, alert_id))
            .ok_or(StoreError::NotFound)?;
        alert.mark_read();
        Ok(alert.clone())
    }

    fn resolve_alert(
        &self,
        clinic_id: ClinicId,
        alert_id: AlertId,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let mut inner = self.write()?;
        let alert = inner
            .alerts
            .get_mut(&(clinic_id, alert_id))
            .ok_or(StoreError::NotFound)?;
        alert.resolve(at);
        Ok(alert.clone())
    }
}
