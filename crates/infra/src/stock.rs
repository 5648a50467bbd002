//! Read-only aggregated stock queries.

use medtrack_core::{ClinicId, DomainError};
use medtrack_inventory::{derive_item_state, Batch, Item, ItemId, ItemState};

use crate::error::ServiceError;
use crate::store::InventoryStore;

/// Read-only consumer of committed batch state; never writes quantities.
#[derive(Debug)]
pub struct StockService<S> {
    store: S,
}

impl<S: InventoryStore> StockService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current derived state for one item. Reads only committed rows, so no
    /// locking is needed; deactivated items behave as missing.
    pub fn item_state(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<ItemState, ServiceError> {
        let item = self
            .store
            .item(clinic_id, item_id)?
            .ok_or(DomainError::NotFound)?;
        if !item.is_active() {
            return Err(DomainError::NotFound.into());
        }
        let batches = self.store.batches_for_item(clinic_id, item_id)?;
        Ok(derive_item_state(&item, &batches))
    }

    /// Derived state for every active item in the clinic.
    pub fn clinic_overview(
        &self,
        clinic_id: ClinicId,
    ) -> Result<Vec<(Item, ItemState)>, ServiceError> {
        let items = self.store.list_items(clinic_id)?;
        let mut overview = Vec::with_capacity(items.len());
        for item in items {
            let batches = self.store.batches_for_item(clinic_id, item.id_typed())?;
            let state = derive_item_state(&item, &batches);
            overview.push((item, state));
        }
        Ok(overview)
    }

    /// All batches of an item, drained ones included.
    pub fn batches(&self, clinic_id: ClinicId, item_id: ItemId) -> Result<Vec<Batch>, ServiceError> {
        Ok(self.store.batches_for_item(clinic_id, item_id)?)
    }
}
