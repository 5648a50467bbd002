//! Infrastructure layer: storage seam + services over the domain crates.

pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod ledger;
pub mod stock;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use catalog::CatalogService;
pub use dispatch::{NoopDispatch, NotificationDispatch};
pub use error::ServiceError;
pub use evaluator::AlertEvaluator;
pub use ledger::LedgerService;
pub use stock::StockService;
pub use store::{AlertStore, InMemoryStore, InventoryStore, StoreError};
