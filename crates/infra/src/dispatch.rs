//! Notification hand-off seam.
//!
//! The evaluator hands created alerts (with the rule's recipients and
//! channels) to a delivery collaborator. Delivery success/failure is not
//! modeled here; transport lives outside the core.

use std::sync::Arc;

use tracing::debug;

use medtrack_alerts::{Alert, AlertRule};

/// Delivery collaborator interface.
pub trait NotificationDispatch: Send + Sync {
    fn deliver(&self, alert: &Alert, rule: &AlertRule);
}

impl<D> NotificationDispatch for Arc<D>
where
    D: NotificationDispatch + ?Sized,
{
    fn deliver(&self, alert: &Alert, rule: &AlertRule) {
        (**self).deliver(alert, rule)
    }
}

/// Dispatch that only logs; useful for dev and for deployments where
/// delivery is wired up elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatch;

impl NotificationDispatch for NoopDispatch {
    fn deliver(&self, alert: &Alert, rule: &AlertRule) {
        debug!(
            alert_id = %alert.id_typed(),
            rule_id = %rule.id_typed(),
            kind = %alert.kind(),
            channels = rule.channels().len(),
            recipients = rule.recipients().len(),
            "alert handed to no-op dispatch"
        );
    }
}
