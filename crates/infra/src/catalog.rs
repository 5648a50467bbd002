//! Item catalog management.

use tracing::{info, instrument};

use medtrack_core::{ClinicId, DomainError, RecordId};
use medtrack_inventory::{Item, ItemId};

use crate::error::ServiceError;
use crate::store::InventoryStore;

/// Registers and maintains a clinic's tracked items.
#[derive(Debug)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: InventoryStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, name, unit), fields(clinic_id = %clinic_id))]
    pub fn register_item(
        &self,
        clinic_id: ClinicId,
        name: impl Into<String>,
        unit: impl Into<String>,
        low_stock_threshold: i64,
    ) -> Result<Item, ServiceError> {
        let item = Item::new(
            ItemId::new(RecordId::new()),
            clinic_id,
            name,
            unit,
            low_stock_threshold,
        )?;
        self.store.insert_item(item.clone())?;
        info!(item_id = %item.id_typed(), name = item.name(), "item registered");
        Ok(item)
    }

    pub fn item(&self, clinic_id: ClinicId, item_id: ItemId) -> Result<Item, ServiceError> {
        Ok(self
            .store
            .item(clinic_id, item_id)?
            .ok_or(DomainError::NotFound)?)
    }

    /// Active items only.
    pub fn list_items(&self, clinic_id: ClinicId) -> Result<Vec<Item>, ServiceError> {
        Ok(self.store.list_items(clinic_id)?)
    }

    /// Soft-delete; ledger history referencing the item is untouched.
    #[instrument(skip(self), fields(clinic_id = %clinic_id, item_id = %item_id))]
    pub fn deactivate_item(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
    ) -> Result<Item, ServiceError> {
        let mut item = self.item(clinic_id, item_id)?;
        item.deactivate();
        self.store.update_item(clinic_id, item.clone())?;
        info!("item deactivated");
        Ok(item)
    }

    #[instrument(skip(self), fields(clinic_id = %clinic_id, item_id = %item_id))]
    pub fn set_low_stock_threshold(
        &self,
        clinic_id: ClinicId,
        item_id: ItemId,
        threshold: i64,
    ) -> Result<Item, ServiceError> {
        let mut item = self.item(clinic_id, item_id)?;
        if !item.is_active() {
            return Err(DomainError::NotFound.into());
        }
        item.set_low_stock_threshold(threshold)?;
        self.store.update_item(clinic_id, item.clone())?;
        info!(threshold, "low-stock threshold updated");
        Ok(item)
    }
}
