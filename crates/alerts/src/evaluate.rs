//! Pure rule evaluation against derived inventory state.
//!
//! The evaluator is decoupled from ledger writes: a scheduler (or explicit
//! request) invokes it per rule, so a burst of adjustments cannot cause an
//! alert storm. Persistence and dedup-by-lookup live in the service layer;
//! everything here is a pure function of its inputs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use medtrack_core::ClinicId;
use medtrack_inventory::{Batch, Item, ItemId, ItemState, StockStatus};

use crate::alert::{Alert, AlertSnapshot, Severity};
use crate::rule::{AlertRule, RuleId, RuleKind};

/// A rule match that has not yet been materialized as an `Alert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub rule_id: RuleId,
    pub clinic_id: ClinicId,
    pub item_id: ItemId,
    pub kind: RuleKind,
    pub severity: Severity,
    pub snapshot: AlertSnapshot,
}

/// Evaluate one rule against one item's current state.
///
/// Returns `None` when the rule is inactive, out of scope for the item, or
/// its condition does not hold. Clinic-wide rules are applied by calling this
/// once per item.
pub fn evaluate_rule(
    rule: &AlertRule,
    item: &Item,
    state: &ItemState,
    batches: &[Batch],
    now: DateTime<Utc>,
) -> Option<AlertCandidate> {
    if !rule.is_active() || !item.is_active() {
        return None;
    }
    if rule.clinic_id() != item.clinic_id() || !rule.scope().covers(item.id_typed()) {
        return None;
    }

    let today = now.date_naive();
    match rule.kind() {
        RuleKind::LowStock => low_stock_candidate(rule, item, state, now),
        RuleKind::ExpiringSoon => expiring_candidate(rule, item, batches, today, now),
        RuleKind::Expired => expired_candidate(rule, item, batches, today, now),
        RuleKind::Custom => None,
    }
}

fn low_stock_candidate(
    rule: &AlertRule,
    item: &Item,
    state: &ItemState,
    now: DateTime<Utc>,
) -> Option<AlertCandidate> {
    let severity = match state.status {
        StockStatus::InStock => return None,
        StockStatus::LowStock => Severity::Medium,
        StockStatus::OutOfStock => Severity::High,
    };

    Some(AlertCandidate {
        rule_id: rule.id_typed(),
        clinic_id: item.clinic_id(),
        item_id: item.id_typed(),
        kind: RuleKind::LowStock,
        severity,
        snapshot: AlertSnapshot {
            quantity: Some(state.total_quantity),
            expiry: None,
            captured_at: now,
        },
    })
}

/// Batches inside the expiry window: `0 <= days-until-expiry <= threshold`.
/// Already-expired batches are excluded here; they belong to `Expired`.
fn expiring_candidate(
    rule: &AlertRule,
    item: &Item,
    batches: &[Batch],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Option<AlertCandidate> {
    let window = rule.threshold()?;

    let matching = item_batches(item, batches).filter(|b| match b.expiry() {
        Some(expiry) => {
            let days = (expiry - today).num_days();
            (0..=window).contains(&days)
        }
        None => false,
    });

    snapshot_of(matching, now).map(|snapshot| AlertCandidate {
        rule_id: rule.id_typed(),
        clinic_id: item.clinic_id(),
        item_id: item.id_typed(),
        kind: RuleKind::ExpiringSoon,
        severity: Severity::Medium,
        snapshot,
    })
}

fn expired_candidate(
    rule: &AlertRule,
    item: &Item,
    batches: &[Batch],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Option<AlertCandidate> {
    let matching = item_batches(item, batches).filter(|b| b.is_expired(today));

    snapshot_of(matching, now).map(|snapshot| AlertCandidate {
        rule_id: rule.id_typed(),
        clinic_id: item.clinic_id(),
        item_id: item.id_typed(),
        kind: RuleKind::Expired,
        severity: Severity::High,
        snapshot,
    })
}

fn item_batches<'a>(item: &'a Item, batches: &'a [Batch]) -> impl Iterator<Item = &'a Batch> {
    batches
        .iter()
        .filter(|b| b.item_id() == item.id_typed() && b.is_available())
}

/// Sum matching quantities and keep the earliest matching expiry; `None`
/// when nothing matched.
fn snapshot_of<'a>(
    matching: impl Iterator<Item = &'a Batch>,
    now: DateTime<Utc>,
) -> Option<AlertSnapshot> {
    let mut quantity: i64 = 0;
    let mut earliest: Option<NaiveDate> = None;
    let mut any = false;

    for batch in matching {
        any = true;
        quantity += batch.quantity();
        earliest = match (earliest, batch.expiry()) {
            (Some(current), Some(e)) => Some(current.min(e)),
            (None, Some(e)) => Some(e),
            (current, None) => current,
        };
    }

    any.then_some(AlertSnapshot {
        quantity: Some(quantity),
        expiry: earliest,
        captured_at: now,
    })
}

/// Duplicate suppression: a candidate is dropped while an unresolved alert
/// exists for the same rule + item + kind. This keeps repeated evaluation
/// idempotent.
pub fn suppressed_by(candidate: &AlertCandidate, existing: &[Alert]) -> bool {
    existing
        .iter()
        .any(|a| a.suppresses(candidate.rule_id, Some(candidate.item_id), candidate.kind))
}
