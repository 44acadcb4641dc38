//! Materialized automations and the change events the store emits for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{step::Step, template::TemplateType};

/// Overall status of an automation.
///
/// Transitions are user-driven:
///
/// ```text
/// draft ──► active ◄──► paused
///             │
///             ▼
///         completed
/// ```
///
/// The executor never changes this value, not even after the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomationStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

impl AutomationStatus {
    /// Return true if a user may move an automation from `self` to `target`.
    pub fn can_transition_to(self, target: AutomationStatus) -> bool {
        matches!(
            (self, target),
            (AutomationStatus::Draft, AutomationStatus::Active)
                | (AutomationStatus::Active, AutomationStatus::Paused)
                | (AutomationStatus::Paused, AutomationStatus::Active)
                | (AutomationStatus::Active, AutomationStatus::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationStatus::Draft => "draft",
            AutomationStatus::Active => "active",
            AutomationStatus::Paused => "paused",
            AutomationStatus::Completed => "completed",
        }
    }
}

/// A template materialized against one deal.
///
/// Step order is fixed at materialization and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TemplateType,
    pub status: AutomationStatus,
    pub steps: Vec<Step>,
    /// The template this automation was materialized from.
    pub template_id: String,
    pub deal_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

/// Partial update applied by `CrmStore::update_automation`.
///
/// `None` leaves a field untouched. `steps`, when present, replaces the
/// whole step list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<AutomationStatus>,
    pub steps: Option<Vec<Step>>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

impl AutomationPatch {
    pub fn status(status: AutomationStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn steps(steps: Vec<Step>) -> Self {
        Self { steps: Some(steps), ..Self::default() }
    }

    /// Apply every set field of the patch to `automation`. Does not touch
    /// `updated_at`; stores stamp that themselves.
    pub fn apply_to(&self, automation: &mut Automation) {
        if let Some(name) = &self.name {
            automation.name = name.clone();
        }
        if let Some(description) = &self.description {
            automation.description = description.clone();
        }
        if let Some(status) = self.status {
            automation.status = status;
        }
        if let Some(steps) = &self.steps {
            automation.steps = steps.clone();
        }
        if let Some(last_run) = self.last_run {
            automation.last_run = Some(last_run);
        }
        if let Some(next_run) = self.next_run {
            automation.next_run = Some(next_run);
        }
    }
}

/// A change delivered to automation subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum AutomationChange {
    Insert { automation: Automation },
    Update { automation: Automation },
    Delete { id: String, deal_id: String },
}

impl AutomationChange {
    /// The deal the changed automation belongs to.
    pub fn deal_id(&self) -> &str {
        match self {
            AutomationChange::Insert { automation } | AutomationChange::Update { automation } => {
                &automation.deal_id
            }
            AutomationChange::Delete { deal_id, .. } => deal_id,
        }
    }
}
