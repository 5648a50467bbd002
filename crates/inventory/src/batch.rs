use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use medtrack_core::{DomainError, DomainResult, Entity, RecordId};

use crate::adjustment::Adjustment;
use crate::item::ItemId;

/// Batch identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub RecordId);

impl BatchId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A lot of physical stock units for one item.
///
/// `quantity` is the only mutable field and changes exclusively through
/// committed ledger entries (`apply`). A batch at quantity 0 stays queryable
/// for history but is excluded from available aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    id: BatchId,
    item_id: ItemId,
    /// Lot number as printed on the packaging; unique per item.
    lot_number: String,
    quantity: i64,
    expiry: Option<NaiveDate>,
    received_at: DateTime<Utc>,
}

impl Batch {
    /// Create an empty batch. Stock arrives through a Receive ledger entry,
    /// never at construction time, so conservation holds from the first row.
    pub fn new(
        id: BatchId,
        item_id: ItemId,
        lot_number: impl Into<String>,
        expiry: Option<NaiveDate>,
        received_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let lot_number = lot_number.into();
        if lot_number.trim().is_empty() {
            return Err(DomainError::validation("lot number cannot be empty"));
        }

        Ok(Self {
            id,
            item_id,
            lot_number,
            quantity: 0,
            expiry,
            received_at,
        })
    }

    pub fn id_typed(&self) -> BatchId {
        self.id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn lot_number(&self) -> &str {
        &self.lot_number
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn expiry(&self) -> Option<NaiveDate> {
        self.expiry
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Whether the batch contributes to available stock.
    pub fn is_available(&self) -> bool {
        self.quantity > 0
    }

    /// Whether the batch has passed its expiry date (no expiry = never expires
    /// for this check, but also never flagged as expiring).
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expiry, Some(expiry) if expiry < today)
    }

    /// Check that an outbound delta can be satisfied from current quantity.
    pub fn check_outbound(&self, delta: i64) -> DomainResult<()> {
        debug_assert!(delta < 0);
        if self.quantity + delta < 0 {
            return Err(DomainError::insufficient_stock(-delta, self.quantity));
        }
        Ok(())
    }

    /// Apply a committed ledger entry to this batch's quantity.
    ///
    /// The entry must target this batch; the non-negative invariant is
    /// enforced again here so quantity can never go below zero regardless of
    /// the caller's pre-checks.
    pub fn apply(&mut self, adjustment: &Adjustment) -> DomainResult<()> {
        if adjustment.batch_id() != Some(self.id) {
            return Err(DomainError::validation(
                "adjustment does not target this batch",
            ));
        }

        let delta = adjustment.delta();
        if delta < 0 {
            self.check_outbound(delta)?;
        }
        self.quantity += delta;
        Ok(())
    }
}

impl Entity for Batch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
