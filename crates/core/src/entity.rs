//! Identity for stored domain records.

/// Implemented by records that keep a stable identity across state changes:
/// an item stays the same item through deactivation and threshold updates,
/// an alert through its whole lifecycle.
pub trait Entity {
    /// Strongly-typed identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
