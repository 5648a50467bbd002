use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medtrack_core::{ClinicId, DomainError, DomainResult, Entity, RecordId, StaffId};

use crate::batch::{Batch, BatchId};
use crate::item::{Item, ItemId};

/// Ledger entry identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentId(pub RecordId);

impl AdjustmentId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AdjustmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of quantity-changing event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Stock received into a batch (positive delta).
    Receive,
    /// Medication dispensed to a patient (negative delta).
    Dispense,
    /// Damaged or lost stock written off (negative delta).
    Damage,
    /// Expired stock written off (negative delta).
    Expire,
    /// Manual correction, either sign; may be item-level (no batch).
    Correction,
}

impl AdjustmentKind {
    /// Sign rule for the kind.
    pub fn permits(self, delta: i64) -> bool {
        match self {
            AdjustmentKind::Receive => delta > 0,
            AdjustmentKind::Dispense | AdjustmentKind::Damage | AdjustmentKind::Expire => delta < 0,
            AdjustmentKind::Correction => delta != 0,
        }
    }

    /// All kinds except item-level corrections target a physical batch.
    pub fn requires_batch(self) -> bool {
        !matches!(self, AdjustmentKind::Correction)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdjustmentKind::Receive => "receive",
            AdjustmentKind::Dispense => "dispense",
            AdjustmentKind::Damage => "damage",
            AdjustmentKind::Expire => "expire",
            AdjustmentKind::Correction => "correction",
        }
    }
}

impl core::fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command: record a quantity-changing event in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAdjustment {
    pub clinic_id: ClinicId,
    pub item_id: ItemId,
    pub batch_id: Option<BatchId>,
    pub kind: AdjustmentKind,
    pub delta: i64,
    pub reason: String,
    pub actor_id: StaffId,
    pub occurred_at: DateTime<Utc>,
}

/// An immutable row in the append-only adjustment ledger.
///
/// Corrections are new rows, never edits. For any batch, the sum of deltas of
/// its adjustments equals the batch's current quantity at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    id: AdjustmentId,
    clinic_id: ClinicId,
    item_id: ItemId,
    batch_id: Option<BatchId>,
    kind: AdjustmentKind,
    delta: i64,
    reason: String,
    actor_id: StaffId,
    recorded_at: DateTime<Utc>,
}

impl Adjustment {
    /// Decide whether the command may be recorded against current state.
    ///
    /// Pure decision logic: checks kind/sign rules, batch-to-item ownership,
    /// and sufficient quantity for outbound deltas. Does not mutate anything;
    /// the returned row still has to be committed atomically together with
    /// the batch quantity update.
    pub fn record(
        id: AdjustmentId,
        item: &Item,
        batch: Option<&Batch>,
        cmd: &RecordAdjustment,
    ) -> DomainResult<Self> {
        if cmd.clinic_id != item.clinic_id() || cmd.item_id != item.id_typed() {
            return Err(DomainError::not_found());
        }
        if !item.is_active() {
            return Err(DomainError::not_found());
        }

        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        if !cmd.kind.permits(cmd.delta) {
            return Err(DomainError::validation(format!(
                "delta sign not allowed for {} adjustment",
                cmd.kind
            )));
        }
        if cmd.kind.requires_batch() && cmd.batch_id.is_none() {
            return Err(DomainError::validation(format!(
                "{} adjustment requires a batch",
                cmd.kind
            )));
        }

        match (cmd.batch_id, batch) {
            (None, _) => {}
            (Some(_), None) => return Err(DomainError::not_found()),
            (Some(batch_id), Some(batch)) => {
                if batch.id_typed() != batch_id {
                    return Err(DomainError::validation("resolved batch id mismatch"));
                }
                if batch.item_id() != item.id_typed() {
                    return Err(DomainError::validation("batch does not belong to item"));
                }
                if cmd.delta < 0 {
                    batch.check_outbound(cmd.delta)?;
                }
            }
        }

        Ok(Self {
            id,
            clinic_id: cmd.clinic_id,
            item_id: cmd.item_id,
            batch_id: cmd.batch_id,
            kind: cmd.kind,
            delta: cmd.delta,
            reason: cmd.reason.clone(),
            actor_id: cmd.actor_id,
            recorded_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> AdjustmentId {
        self.id
    }

    pub fn clinic_id(&self) -> ClinicId {
        self.clinic_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn batch_id(&self) -> Option<BatchId> {
        self.batch_id
    }

    pub fn kind(&self) -> AdjustmentKind {
        self.kind
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn actor_id(&self) -> StaffId {
        self.actor_id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl Entity for Adjustment {
    type Id = AdjustmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
