//! Alert evaluation service.
//!
//! Invoked per rule by an external trigger (cron-like scheduler or explicit
//! request); deliberately decoupled from ledger writes so a burst of
//! adjustments cannot storm the alert table. Repeated evaluation with no
//! intervening state change creates no duplicates.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use medtrack_alerts::{
    evaluate_rule, Alert, AlertCandidate, AlertId, AlertRule, Channel, RuleId, RuleKind, RuleScope,
};
use medtrack_core::{ClinicId, DomainError, RecordId};
use medtrack_inventory::{derive_item_state, Item};

use crate::dispatch::NotificationDispatch;
use crate::error::ServiceError;
use crate::store::{AlertStore, InventoryStore};

/// Evaluates configured rules against derived stock state and materializes
/// deduplicated alerts. Read-only towards inventory.
#[derive(Debug)]
pub struct AlertEvaluator<S, D> {
    store: S,
    dispatch: D,
}

impl<S, D> AlertEvaluator<S, D>
where
    S: InventoryStore + AlertStore,
    D: NotificationDispatch,
{
    pub fn new(store: S, dispatch: D) -> Self {
        Self { store, dispatch }
    }

    #[instrument(skip(self, scope, threshold, channels, recipients), fields(clinic_id = %clinic_id))]
    pub fn register_rule(
        &self,
        clinic_id: ClinicId,
        scope: RuleScope,
        kind: RuleKind,
        threshold: Option<i64>,
        channels: Vec<Channel>,
        recipients: Vec<String>,
    ) -> Result<AlertRule, ServiceError> {
        let rule = AlertRule::new(
            RuleId::new(RecordId::new()),
            clinic_id,
            scope,
            kind,
            threshold,
            channels,
            recipients,
        )?;
        self.store.insert_rule(rule.clone())?;
        info!(rule_id = %rule.id_typed(), kind = %rule.kind(), "alert rule registered");
        Ok(rule)
    }

    pub fn disable_rule(
        &self,
        clinic_id: ClinicId,
        rule_id: RuleId,
    ) -> Result<AlertRule, ServiceError> {
        let mut rule = self
            .store
            .rule(clinic_id, rule_id)?
            .ok_or(DomainError::NotFound)?;
        rule.disable();
        self.store.update_rule(clinic_id, rule.clone())?;
        Ok(rule)
    }

    /// Evaluate one rule now. Returns the alerts created by this invocation
    /// (empty when nothing matched, everything was suppressed, or the rule
    /// is disabled).
    #[instrument(skip(self), fields(clinic_id = %clinic_id, rule_id = %rule_id))]
    pub fn evaluate_rule(
        &self,
        clinic_id: ClinicId,
        rule_id: RuleId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>, ServiceError> {
        let rule = self
            .store
            .rule(clinic_id, rule_id)?
            .ok_or(DomainError::NotFound)?;
        if !rule.is_active() {
            return Ok(Vec::new());
        }

        let items: Vec<Item> = match rule.scope() {
            RuleScope::Item(item_id) => {
                let item = self
                    .store
                    .item(clinic_id, item_id)?
                    .ok_or(DomainError::NotFound)?;
                vec![item]
            }
            RuleScope::Clinic => self.store.list_items(clinic_id)?,
        };

        let mut created = Vec::new();
        for item in &items {
            if !item.is_active() {
                continue;
            }
            let batches = self.store.batches_for_item(clinic_id, item.id_typed())?;
            let state = derive_item_state(item, &batches);

            let Some(candidate) = evaluate_rule(&rule, item, &state, &batches, now) else {
                continue;
            };

            if let Some(existing) = self.store.open_alert(
                clinic_id,
                candidate.rule_id,
                Some(candidate.item_id),
                candidate.kind,
            )? {
                debug!(
                    alert_id = %existing.id_typed(),
                    item_id = %candidate.item_id,
                    "candidate suppressed by unresolved alert"
                );
                continue;
            }

            let alert = self.materialize(candidate, now)?;
            self.dispatch.deliver(&alert, &rule);
            created.push(alert);
        }

        Ok(created)
    }

    /// Walk every active rule of the clinic; the scheduler-facing entry
    /// point. Invocation cadence is the caller's concern.
    pub fn evaluate_all(
        &self,
        clinic_id: ClinicId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>, ServiceError> {
        let mut created = Vec::new();
        for rule in self.store.active_rules(clinic_id)? {
            created.extend(self.evaluate_rule(clinic_id, rule.id_typed(), now)?);
        }
        Ok(created)
    }

    fn materialize(
        &self,
        candidate: AlertCandidate,
        now: DateTime<Utc>,
    ) -> Result<Alert, ServiceError> {
        let alert = Alert::open(
            AlertId::new(RecordId::new()),
            candidate.rule_id,
            candidate.clinic_id,
            Some(candidate.item_id),
            candidate.kind,
            candidate.severity,
            candidate.snapshot,
            now,
        );
        self.store.insert_alert(alert.clone())?;
        info!(
            alert_id = %alert.id_typed(),
            kind = %alert.kind(),
            severity = ?alert.severity(),
            "alert created"
        );
        Ok(alert)
    }

    pub fn alerts(&self, clinic_id: ClinicId) -> Result<Vec<Alert>, ServiceError> {
        Ok(self.store.alerts(clinic_id)?)
    }

    /// Unresolved alerts only (open or read).
    pub fn unresolved_alerts(&self, clinic_id: ClinicId) -> Result<Vec<Alert>, ServiceError> {
        Ok(self
            .store
            .alerts(clinic_id)?
            .into_iter()
            .filter(|a| !a.is_resolved())
            .collect())
    }

    pub fn mark_read(&self, clinic_id: ClinicId, alert_id: AlertId) -> Result<Alert, ServiceError> {
        Ok(self.store.mark_alert_read(clinic_id, alert_id)?)
    }

    /// Resolve an alert; this reopens eligibility for the same condition to
    /// trigger a fresh alert on a later evaluation.
    pub fn resolve(
        &self,
        clinic_id: ClinicId,
        alert_id: AlertId,
        at: DateTime<Utc>,
    ) -> Result<Alert, ServiceError> {
        Ok(self.store.resolve_alert(clinic_id, alert_id, at)?)
    }
}
