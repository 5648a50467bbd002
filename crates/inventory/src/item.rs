use serde::{Deserialize, Serialize};

use medtrack_core::{ClinicId, DomainError, DomainResult, Entity, Lifecycle, RecordId};

/// Inventory item identifier (clinic-scoped via `clinic_id` on the item).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub RecordId);

impl ItemId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A medication (or supply) tracked by a clinic.
///
/// Items are never hard-deleted while adjustments reference them; they are
/// deactivated and every query path checks the lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    clinic_id: ClinicId,
    name: String,
    /// Unit of measure, e.g. "tablet", "vial", "ml".
    unit: String,
    /// Inclusive low-stock boundary: total quantity <= threshold is low.
    low_stock_threshold: i64,
    lifecycle: Lifecycle,
}

impl Item {
    pub fn new(
        id: ItemId,
        clinic_id: ClinicId,
        name: impl Into<String>,
        unit: impl Into<String>,
        low_stock_threshold: i64,
    ) -> DomainResult<Self> {
        let name = name.into();
        let unit = unit.into();

        if name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if unit.trim().is_empty() {
            return Err(DomainError::validation("unit of measure cannot be empty"));
        }
        if low_stock_threshold < 0 {
            return Err(DomainError::validation(
                "low-stock threshold cannot be negative",
            ));
        }

        Ok(Self {
            id,
            clinic_id,
            name,
            unit,
            low_stock_threshold,
            lifecycle: Lifecycle::Active,
        })
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn clinic_id(&self) -> ClinicId {
        self.clinic_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Soft-delete: the item disappears from active listings but its ledger
    /// history stays intact.
    pub fn deactivate(&mut self) {
        self.lifecycle.deactivate();
    }

    /// Update the low-stock boundary (e.g. seasonal demand changes).
    pub fn set_low_stock_threshold(&mut self, threshold: i64) -> DomainResult<()> {
        if threshold < 0 {
            return Err(DomainError::validation(
                "low-stock threshold cannot be negative",
            ));
        }
        self.low_stock_threshold = threshold;
        Ok(())
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
