//! Evaluator output types.

use serde::{Deserialize, Serialize};

/// Classification of a template trigger tag.
///
/// The vocabulary is closed: tags outside it classify as `Unrecognized`
/// and make the template ineligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    /// No trigger; the user starts the automation by hand.
    Manual,
    /// `stage-*` tags.
    Stage,
    /// Interval and milestone tags (`days`, `weekly`, `milestone`).
    Date,
    /// Deal events (`changed`, `uploaded`, `overdue`).
    Event,
    Unrecognized,
}

impl TriggerKind {
    pub fn is_valid(self) -> bool {
        self != TriggerKind::Unrecognized
    }
}

/// What the evaluator learned about one template against one deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub is_condition_valid: bool,
    pub is_trigger_valid: bool,
    pub has_email_steps: bool,
    pub has_task_steps: bool,
    pub has_communication_steps: bool,
    pub has_conditional_logic: bool,
    pub has_stage_triggers: bool,
    pub has_date_triggers: bool,
}

impl EvaluationReport {
    /// Both the condition and the trigger are satisfied, so the template may
    /// be offered for materialization.
    pub fn is_eligible(&self) -> bool {
        self.is_condition_valid && self.is_trigger_valid
    }
}
