//! Adjustment ledger service: the only writer of batch quantities.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use medtrack_core::{ClinicId, DomainError, RecordId, StaffId};
use medtrack_inventory::{
    Adjustment, AdjustmentId, AdjustmentKind, Batch, BatchId, ItemId, RecordAdjustment,
};

use crate::error::ServiceError;
use crate::store::InventoryStore;

/// Appends ledger entries and applies their deltas atomically through the
/// store. Aggregator and evaluator are read-only consumers; nothing else
/// writes batch quantities.
#[derive(Debug)]
pub struct LedgerService<S> {
    store: S,
}

impl<S: InventoryStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record one quantity-changing event.
    ///
    /// The domain pre-check gives precise errors against a snapshot of the
    /// batch; the store's commit re-runs the quantity guard under exclusive
    /// access and is authoritative, so two concurrent dispenses against the
    /// same batch serialize and cannot drive the quantity negative. Failure
    /// at either step leaves no ledger row and no quantity change.
    #[instrument(
        skip(self, cmd),
        fields(
            clinic_id = %cmd.clinic_id,
            item_id = %cmd.item_id,
            kind = %cmd.kind,
            delta = cmd.delta,
        )
    )]
    pub fn apply(&self, cmd: RecordAdjustment) -> Result<Adjustment, ServiceError> {
        let item = self
            .store
            .item(cmd.clinic_id, cmd.item_id)?
            .ok_or(DomainError::NotFound)?;

        let batch = match cmd.batch_id {
            Some(batch_id) => Some(
                self.store
                    .batch(cmd.clinic_id, batch_id)?
                    .ok_or(DomainError::NotFound)?,
            ),
            None => None,
        };

        let adjustment = Adjustment::record(
            AdjustmentId::new(RecordId::new()),
            &item,
            batch.as_ref(),
            &cmd,
        )
        .inspect_err(|err| warn!(%err, "adjustment rejected"))?;

        let committed = self.store.commit_adjustment(adjustment)?;
        info!(adjustment_id = %committed.id_typed(), "adjustment committed");
        Ok(committed)
    }

    /// Receive a shipment: create the batch and commit its opening Receive
    /// entry in one store operation, so a duplicate lot number or a storage
    /// fault leaves neither a batch nor a ledger row behind.
    #[instrument(
        skip(self, lot_number, reason),
        fields(clinic_id = %clinic_id, item_id = %item_id, quantity)
    )]
    pub fn receive(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
        lot_number: impl Into<String>,
        expiry: Option<NaiveDate>,
        quantity: i64,
        reason: impl Into<String>,
        actor_id: StaffId,
        occurred_at: DateTime<Utc>,
    ) -> Result<(Batch, Adjustment), ServiceError> {
        if quantity <= 0 {
            return Err(DomainError::validation("received quantity must be positive").into());
        }

        let item = self
            .store
            .item(clinic_id, item_id)?
            .ok_or(DomainError::NotFound)?;
        if !item.is_active() {
            return Err(DomainError::NotFound.into());
        }

        let batch = Batch::new(
            BatchId::new(RecordId::new()),
            item_id,
            lot_number,
            expiry,
            occurred_at,
        )?;
        let cmd = RecordAdjustment {
            clinic_id,
            item_id,
            batch_id: Some(batch.id_typed()),
            kind: AdjustmentKind::Receive,
            delta: quantity,
            reason: reason.into(),
            actor_id,
            occurred_at,
        };
        let adjustment =
            Adjustment::record(AdjustmentId::new(RecordId::new()), &item, Some(&batch), &cmd)
                .inspect_err(|err| warn!(%err, "receipt rejected"))?;

        let batch = self
            .store
            .commit_receipt(clinic_id, batch, adjustment.clone())?;
        info!(
            batch_id = %batch.id_typed(),
            lot = batch.lot_number(),
            adjustment_id = %adjustment.id_typed(),
            "shipment received"
        );
        Ok((batch, adjustment))
    }

    /// Dispense medication from a batch.
    pub fn dispense(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
        batch_id: BatchId,
        quantity: i64,
        reason: impl Into<String>,
        actor_id: StaffId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Adjustment, ServiceError> {
        if quantity <= 0 {
            return Err(DomainError::validation("dispensed quantity must be positive").into());
        }
        self.apply(RecordAdjustment {
            clinic_id,
            item_id,
            batch_id: Some(batch_id),
            kind: AdjustmentKind::Dispense,
            delta: -quantity,
            reason: reason.into(),
            actor_id,
            occurred_at,
        })
    }

    /// Write off the full remaining quantity of an expired batch.
    pub fn write_off_expired(
        &self,
        clinic_id: ClinicId,
        batch_id: BatchId,
        actor_id: StaffId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Adjustment, ServiceError> {
        let batch = self
            .store
            .batch(clinic_id, batch_id)?
            .ok_or(DomainError::NotFound)?;
        if !batch.is_available() {
            return Err(DomainError::validation("batch holds no stock to write off").into());
        }
        self.apply(RecordAdjustment {
            clinic_id,
            item_id: batch.item_id(),
            batch_id: Some(batch_id),
            kind: AdjustmentKind::Expire,
            delta: -batch.quantity(),
            reason: "expired stock write-off".to_string(),
            actor_id,
            occurred_at,
        })
    }

    /// Audit trail for one batch, in commit order.
    pub fn batch_history(
        &self,
        clinic_id: ClinicId,
        batch_id: BatchId,
    ) -> Result<Vec<Adjustment>, ServiceError> {
        Ok(self.store.adjustments_for_batch(clinic_id, batch_id)?)
    }

    /// Audit trail for one item (batch-level and item-level rows).
    pub fn item_history(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Vec<Adjustment>, ServiceError> {
        Ok(self.store.adjustments_for_item(clinic_id, item_id)?)
    }
}
