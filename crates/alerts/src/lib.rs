//! Alerting domain module.
//!
//! Configured rules (low stock, expiry windows) are checked against derived
//! inventory state by a pure evaluator; matches become deduplicated `Alert`
//! records with a one-directional lifecycle. No IO, no storage, no delivery.

pub mod alert;
pub mod evaluate;
pub mod rule;

pub use alert::{Alert, AlertId, AlertSnapshot, AlertStatus, Severity};
pub use evaluate::{evaluate_rule, suppressed_by, AlertCandidate};
pub use rule::{AlertRule, Channel, RuleId, RuleKind, RuleScope};
