//! Step types shared by templates and materialized automations.
//!
//! A template's steps and an automation's steps have the same shape. The
//! runtime fields (`status`, `scheduled_at`, `completed_at`) are only
//! meaningful on an automation; the materializer resets them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{deal::Priority, records::CommunicationType};

/// Runtime status of a single step.
///
/// `Pending → Active → {Completed | Failed}`. Delay steps never leave
/// `Pending`; their continuation runs the following step instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Failed,
}

/// What a step does, with the fields specific to that kind.
///
/// Tagged by `type` on the wire:
///
/// ```toml
/// [[templates.steps]]
/// id = "intro"
/// type = "email"
/// name = "Introduction"
/// emailSubject = "Next steps for {deal}"
/// emailBody = "Hi {contact}, ..."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepAction {
    /// Compose an email from subject/body templates.
    #[serde(rename_all = "camelCase")]
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email_subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email_body: Option<String>,
    },

    /// A call the deal owner makes by hand.
    Call,

    /// Create a task on the deal.
    #[serde(rename_all = "camelCase")]
    Task {
        task_title: String,
        #[serde(default)]
        task_priority: Priority,
    },

    /// An AI-assisted action performed outside the runtime.
    Ai,

    /// Wait before running the next step.
    #[serde(rename_all = "camelCase")]
    Delay { delay_days: u32 },

    /// Log a communication against the deal.
    #[serde(rename_all = "camelCase")]
    Communication {
        #[serde(default)]
        communication_type: CommunicationType,
        communication_content: String,
    },

    /// Record an attachment. There is no upload path; this is logged only.
    #[serde(rename_all = "camelCase")]
    Attachment {
        attachment_name: String,
        #[serde(default)]
        attachment_type: String,
    },
}

impl StepAction {
    /// The wire name of this step kind (`"email"`, `"delay"`, ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            StepAction::Email { .. } => "email",
            StepAction::Call => "call",
            StepAction::Task { .. } => "task",
            StepAction::Ai => "ai",
            StepAction::Delay { .. } => "delay",
            StepAction::Communication { .. } => "communication",
            StepAction::Attachment { .. } => "attachment",
        }
    }
}

/// One unit of work in a template or automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(flatten)]
    pub action: StepAction,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    /// Build a pending step with no runtime timestamps.
    pub fn new(id: impl Into<String>, name: impl Into<String>, action: StepAction) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            details: String::new(),
            action,
            status: StepStatus::Pending,
            scheduled_at: None,
            completed_at: None,
        }
    }

    /// Attach a human-readable description.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn is_delay(&self) -> bool {
        matches!(self.action, StepAction::Delay { .. })
    }
}
