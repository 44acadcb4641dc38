//! Deal records as the automation runtime sees them.
//!
//! Deals belong to the surrounding CRM. The evaluator and executor only ever
//! read them; any change goes through `CrmStore::update_deal`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pipeline stage of a deal.
///
/// Serialized in kebab-case so that TOML conditions can compare against the
/// same strings the CRM stores (e.g. `"closed-won"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DealStage {
    Lead,
    Qualification,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    /// The wire name of the stage, as used in trigger tags and placeholders.
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Lead => "lead",
            DealStage::Qualification => "qualification",
            DealStage::Proposal => "proposal",
            DealStage::Negotiation => "negotiation",
            DealStage::ClosedWon => "closed-won",
            DealStage::ClosedLost => "closed-lost",
        }
    }
}

/// Priority shared by deals and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A sales opportunity.
///
/// Field names serialize in camelCase; template conditions address them by
/// that name (`value`, `stage`, `probability`, `expectedCloseDate`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub title: String,
    pub company: String,
    /// Display name of the primary contact.
    pub contact: String,
    /// Deal amount in the account currency.
    pub value: f64,
    pub stage: DealStage,
    pub priority: Priority,
    /// Win probability, 0–100.
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Deal {
    /// Look up a field by its wire name.
    ///
    /// Returns `None` for unknown fields and for optional fields that are
    /// unset, which is how the evaluator distinguishes "missing".
    pub fn field(&self, name: &str) -> Option<Value> {
        let value = serde_json::to_value(self).ok()?;
        match value {
            Value::Object(mut map) => map.remove(name).filter(|v| !v.is_null()),
            _ => None,
        }
    }

    /// Whole days since the deal was created, if the creation time is known.
    pub fn age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.created_at.map(|created| (now - created).num_days())
    }
}

/// Partial update applied by `CrmStore::update_deal`. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub contact: Option<String>,
    pub value: Option<f64>,
    pub stage: Option<DealStage>,
    pub priority: Option<Priority>,
    pub probability: Option<f64>,
    pub owner: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
}

impl DealPatch {
    /// Apply every set field of the patch to `deal`.
    pub fn apply_to(&self, deal: &mut Deal) {
        if let Some(title) = &self.title {
            deal.title = title.clone();
        }
        if let Some(company) = &self.company {
            deal.company = company.clone();
        }
        if let Some(contact) = &self.contact {
            deal.contact = contact.clone();
        }
        if let Some(value) = self.value {
            deal.value = value;
        }
        if let Some(stage) = self.stage {
            deal.stage = stage;
        }
        if let Some(priority) = self.priority {
            deal.priority = priority;
        }
        if let Some(probability) = self.probability {
            deal.probability = probability;
        }
        if let Some(owner) = &self.owner {
            deal.owner = Some(owner.clone());
        }
        if let Some(date) = self.expected_close_date {
            deal.expected_close_date = Some(date);
        }
    }
}
