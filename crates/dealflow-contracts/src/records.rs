//! Records the executor writes through the store: tasks and communications,
//! plus the contact record read by the enrichment service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::deal::Priority;

/// Progress of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A to-do item attached to a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub deal_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// A new pending task with a fresh id.
    pub fn pending(deal_id: impl Into<String>, title: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            deal_id: deal_id.into(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority,
            due_date: None,
            created_at: Utc::now(),
        }
    }
}

/// Channel of a logged communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationType {
    Email,
    Call,
    Meeting,
    #[default]
    Note,
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// A logged interaction on a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: String,
    pub deal_id: String,
    #[serde(rename = "type")]
    pub kind: CommunicationType,
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Communication {
    /// A new outbound communication with a fresh id.
    pub fn outbound(
        deal_id: impl Into<String>,
        kind: CommunicationType,
        subject: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            deal_id: deal_id.into(),
            kind,
            direction: Direction::Outbound,
            subject,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A person in the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
