//! Automation templates: immutable blueprints loaded from the catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::step::{Step, StepAction};

/// Broad category of a template, used for filtering in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    /// A timed sequence of touches.
    Drip,
    /// Reacts to something happening on the deal.
    Event,
    /// Fires relative to a date or interval.
    Date,
    /// Driven by AI-generated insight.
    Ai,
}

/// Comparison applied by a condition.
///
/// Anything not listed deserializes into `Unknown`, which the evaluator
/// always treats as unsatisfied rather than rejecting the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "empty")]
    Empty,
    #[serde(other)]
    Unknown,
}

/// A single eligibility predicate: `deal[field] <operator> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Deal field wire name, e.g. `"value"` or `"stage"`.
    pub field: String,
    pub operator: ConditionOperator,
    /// Right-hand side. Ignored by `empty`.
    #[serde(default)]
    pub value: Value,
}

/// An immutable blueprint for an automation sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Stable identifier, e.g. `"high-value-acceleration"`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TemplateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Free-form tag classified by the evaluator (`"stage-proposal"`,
    /// `"30-days-inactive"`, `"document-uploaded"`, ...). Absent means manual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Template {
    /// True if any step matches `predicate`.
    pub fn has_step(&self, predicate: impl Fn(&StepAction) -> bool) -> bool {
        self.steps.iter().any(|s| predicate(&s.action))
    }
}
