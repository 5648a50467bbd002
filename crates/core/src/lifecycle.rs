//! Entity lifecycle state.
//!
//! Records referenced by ledger history are never hard-deleted; they move to
//! `Deactivated` and every query path checks the state uniformly instead of
//! scattering boolean flags through call sites.

use serde::{Deserialize, Serialize};

/// Lifecycle state shared by soft-deletable entities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Deactivated,
}

impl Lifecycle {
    pub fn is_active(self) -> bool {
        self == Lifecycle::Active
    }

    /// One-way transition; deactivating twice is a no-op.
    pub fn deactivate(&mut self) {
        *self = Lifecycle::Deactivated;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::Active
    }
}
