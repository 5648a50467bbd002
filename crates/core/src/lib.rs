//! `medtrack-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod lifecycle;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ClinicId, RecordId, StaffId};
pub use lifecycle::Lifecycle;
