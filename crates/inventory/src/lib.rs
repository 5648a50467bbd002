//! Inventory domain module.
//!
//! This crate contains the business rules for medication stock: items,
//! expiry-dated batches, the append-only adjustment ledger, and the pure
//! stock aggregator. No IO, no HTTP, no storage.

pub mod adjustment;
pub mod batch;
pub mod item;
pub mod state;

pub use adjustment::{Adjustment, AdjustmentId, AdjustmentKind, RecordAdjustment};
pub use batch::{Batch, BatchId};
pub use item::{Item, ItemId};
pub use state::{derive_item_state, ItemState, StockStatus};
