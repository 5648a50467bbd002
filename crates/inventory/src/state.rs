//! Stock aggregator: derive an item's current state from its batches.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::batch::Batch;
use crate::item::Item;

/// Derived stock classification against the item's low-stock threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

/// Aggregated view of an item's current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    pub total_quantity: i64,
    pub status: StockStatus,
    /// Earliest expiry among available batches that carry an expiry date.
    /// Batches without an expiry never contribute here.
    pub earliest_expiry: Option<NaiveDate>,
}

/// Derive the item's total quantity, stock status, and earliest expiry.
///
/// Pure function of current batch state: no side effects, safe to call
/// repeatedly. Only batches that belong to the item and hold quantity > 0
/// count; the threshold comparison is inclusive (equal counts as low).
pub fn derive_item_state(item: &Item, batches: &[Batch]) -> ItemState {
    let available = batches
        .iter()
        .filter(|b| b.item_id() == item.id_typed() && b.is_available());

    let mut total_quantity: i64 = 0;
    let mut earliest_expiry: Option<NaiveDate> = None;

    for batch in available {
        total_quantity += batch.quantity();
        if let Some(expiry) = batch.expiry() {
            earliest_expiry = match earliest_expiry {
                Some(current) => Some(current.min(expiry)),
                None => Some(expiry),
            };
        }
    }

    let status = if total_quantity == 0 {
        StockStatus::OutOfStock
    } else if total_quantity <= item.low_stock_threshold() {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    };

    ItemState {
        total_quantity,
        status,
        earliest_expiry,
    }
}
