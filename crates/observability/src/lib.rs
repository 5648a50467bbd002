//! Process-wide tracing setup for the inventory services.

/// Initialize structured logging for a process embedding the services.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filter, JSON output).
pub mod tracing;
