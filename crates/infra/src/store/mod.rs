//! Persistence seam: storage traits + in-memory implementation.
//!
//! A relational backend is an external collaborator; the core only requires
//! the transactional contract expressed by these traits (atomic ledger
//! commit, clinic isolation, foreign-key integrity).

mod in_memory;
mod r#trait;

pub use in_memory::InMemoryStore;
pub use r#trait::{AlertStore, InventoryStore, StoreError};
