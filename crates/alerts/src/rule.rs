use serde::{Deserialize, Serialize};

use medtrack_core::{ClinicId, DomainError, DomainResult, Entity, RecordId};
use medtrack_inventory::ItemId;

/// Alert rule identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub RecordId);

impl RuleId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RuleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What the rule watches: one item, or every item in the clinic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "item_id", rename_all = "snake_case")]
pub enum RuleScope {
    Item(ItemId),
    Clinic,
}

impl RuleScope {
    pub fn covers(self, item_id: ItemId) -> bool {
        match self {
            RuleScope::Item(scoped) => scoped == item_id,
            RuleScope::Clinic => true,
        }
    }
}

/// Condition kind checked by the evaluator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    LowStock,
    ExpiringSoon,
    Expired,
    /// Reserved for externally-defined conditions; the built-in evaluator
    /// never emits candidates for it.
    Custom,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::LowStock => "low_stock",
            RuleKind::ExpiringSoon => "expiring_soon",
            RuleKind::Expired => "expired",
            RuleKind::Custom => "custom",
        }
    }
}

impl core::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery channel for notifications produced from this rule.
///
/// Typed at the core boundary; transport is an external collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    InApp,
}

/// A configured alert condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    id: RuleId,
    clinic_id: ClinicId,
    scope: RuleScope,
    kind: RuleKind,
    /// Day-count window for `ExpiringSoon`; optional quantity floor for
    /// `LowStock` (classification itself follows the item's threshold).
    threshold: Option<i64>,
    channels: Vec<Channel>,
    recipients: Vec<String>,
    active: bool,
}

impl AlertRule {
    pub fn new(
        id: RuleId,
        clinic_id: ClinicId,
        scope: RuleScope,
        kind: RuleKind,
        threshold: Option<i64>,
        channels: Vec<Channel>,
        recipients: Vec<String>,
    ) -> DomainResult<Self> {
        if let Some(t) = threshold {
            if t < 0 {
                return Err(DomainError::validation("rule threshold cannot be negative"));
            }
        }
        if kind == RuleKind::ExpiringSoon && threshold.is_none() {
            return Err(DomainError::validation(
                "expiring-soon rule requires a day-count threshold",
            ));
        }

        Ok(Self {
            id,
            clinic_id,
            scope,
            kind,
            threshold,
            channels,
            recipients,
            active: true,
        })
    }

    pub fn id_typed(&self) -> RuleId {
        self.id
    }

    pub fn clinic_id(&self) -> ClinicId {
        self.clinic_id
    }

    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn threshold(&self) -> Option<i64> {
        self.threshold
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn disable(&mut self) {
        self.active = false;
    }

    pub fn enable(&mut self) {
        self.active = true;
    }
}

impl Entity for AlertRule {
    type Id = RuleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
