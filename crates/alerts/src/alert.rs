use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use medtrack_core::{ClinicId, Entity, RecordId};
use medtrack_inventory::ItemId;

use crate::rule::{RuleId, RuleKind};

/// Alert identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub RecordId);

impl AlertId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AlertId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Severity assigned at trigger time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

/// One-directional lifecycle: `Open → Read → Resolved`.
///
/// Resolving force-sets read (there is no resolved-but-unread state), and
/// nothing un-resolves an alert; a rule re-triggers a *new* alert instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Read,
    Resolved,
}

/// Triggering state captured when the alert is created, for audit.
/// Never recomputed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSnapshot {
    /// Quantity that tripped the rule (total for stock rules, at-risk sum for
    /// expiry rules).
    pub quantity: Option<i64>,
    /// Relevant expiry date (earliest matching batch), if the rule is
    /// expiry-based.
    pub expiry: Option<NaiveDate>,
    pub captured_at: DateTime<Utc>,
}

/// A materialized, deduplicated notification instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    id: AlertId,
    rule_id: RuleId,
    clinic_id: ClinicId,
    item_id: Option<ItemId>,
    kind: RuleKind,
    severity: Severity,
    status: AlertStatus,
    snapshot: AlertSnapshot,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn open(
        id: AlertId,
        rule_id: RuleId,
        clinic_id: ClinicId,
        item_id: Option<ItemId>,
        kind: RuleKind,
        severity: Severity,
        snapshot: AlertSnapshot,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rule_id,
            clinic_id,
            item_id,
            kind,
            severity,
            status: AlertStatus::Open,
            snapshot,
            created_at,
            resolved_at: None,
        }
    }

    pub fn id_typed(&self) -> AlertId {
        self.id
    }

    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    pub fn clinic_id(&self) -> ClinicId {
        self.clinic_id
    }

    pub fn item_id(&self) -> Option<ItemId> {
        self.item_id
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn snapshot(&self) -> &AlertSnapshot {
        &self.snapshot
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn is_read(&self) -> bool {
        self.status != AlertStatus::Open
    }

    pub fn is_resolved(&self) -> bool {
        self.status == AlertStatus::Resolved
    }

    /// `Open → Read`; already-read and resolved alerts are left unchanged.
    pub fn mark_read(&mut self) {
        if self.status == AlertStatus::Open {
            self.status = AlertStatus::Read;
        }
    }

    /// Any state → `Resolved`, forcing read. Idempotent; the first
    /// resolution timestamp wins.
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        if self.status != AlertStatus::Resolved {
            self.status = AlertStatus::Resolved;
            self.resolved_at = Some(at);
        }
    }

    /// Whether this alert blocks a new one for the same condition:
    /// same rule + item + kind, not yet resolved.
    pub fn suppresses(&self, rule_id: RuleId, item_id: Option<ItemId>, kind: RuleKind) -> bool {
        !self.is_resolved()
            && self.rule_id == rule_id
            && self.item_id == item_id
            && self.kind == kind
    }
}

impl Entity for Alert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
