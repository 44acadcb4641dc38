//! Template eligibility evaluation.
//!
//! Everything here is a pure function of `(template, deal)`: no I/O, no
//! hidden state, no errors. Malformed input degrades to `false`.
//!
//! Condition semantics:
//!
//! | operator   | satisfied when                                              |
//! |------------|-------------------------------------------------------------|
//! | `>` / `<`  | deal field is a number and compares numerically             |
//! | `equals`   | strict equality, no coercion between strings and numbers   |
//! | `contains` | case-insensitive substring after coercing both to strings   |
//! | `empty`    | deal field is missing, null, false, 0, or `""`              |
//! | other      | never                                                       |
//!
//! A condition on a missing field compares the literal string `"undefined"`
//! for `equals` and `contains`.

use serde_json::Value;

use dealflow_contracts::{
    deal::Deal,
    evaluation::{EvaluationReport, TriggerKind},
    step::StepAction,
    template::{Condition, ConditionOperator, Template},
};

/// Placeholder used for a missing deal field in string comparisons.
const MISSING: &str = "undefined";

const DATE_MARKERS: [&str; 3] = ["days", "weekly", "milestone"];
const EVENT_MARKERS: [&str; 3] = ["changed", "uploaded", "overdue"];

/// Evaluate `template` against `deal`.
pub fn evaluate(template: &Template, deal: &Deal) -> EvaluationReport {
    let trigger = classify_trigger(template.trigger.as_deref());

    EvaluationReport {
        is_condition_valid: condition_holds(template.condition.as_ref(), deal),
        is_trigger_valid: trigger.is_valid(),
        has_email_steps: template.has_step(|a| matches!(a, StepAction::Email { .. })),
        has_task_steps: template.has_step(|a| matches!(a, StepAction::Task { .. })),
        has_communication_steps: template.has_step(|a| matches!(a, StepAction::Communication { .. })),
        has_conditional_logic: template.condition.is_some(),
        has_stage_triggers: trigger == TriggerKind::Stage,
        has_date_triggers: trigger == TriggerKind::Date,
    }
}

/// Classify a trigger tag against the fixed vocabulary.
///
/// Checked in order: empty/absent → manual, `stage-` prefix → stage, date
/// markers → date, event markers → event. New vocabularies must be added
/// here.
pub fn classify_trigger(trigger: Option<&str>) -> TriggerKind {
    let Some(trigger) = trigger.filter(|t| !t.is_empty()) else {
        return TriggerKind::Manual;
    };

    if trigger.starts_with("stage-") {
        TriggerKind::Stage
    } else if DATE_MARKERS.iter().any(|m| trigger.contains(m)) {
        TriggerKind::Date
    } else if EVENT_MARKERS.iter().any(|m| trigger.contains(m)) {
        TriggerKind::Event
    } else {
        TriggerKind::Unrecognized
    }
}

/// Whether an optional condition holds. No condition means always eligible.
pub fn condition_holds(condition: Option<&Condition>, deal: &Deal) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    let actual = deal.field(&condition.field);
    let expected = &condition.value;

    match condition.operator {
        ConditionOperator::GreaterThan => compare(actual.as_ref(), expected, |a, b| a > b),
        ConditionOperator::LessThan => compare(actual.as_ref(), expected, |a, b| a < b),
        ConditionOperator::Equals => {
            let actual = actual.unwrap_or_else(|| Value::String(MISSING.to_string()));
            strict_equals(&actual, expected)
        }
        ConditionOperator::Contains => {
            let haystack = actual.as_ref().map_or_else(|| MISSING.to_string(), coerce_to_string);
            let needle = coerce_to_string(expected);
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
        ConditionOperator::Empty => is_falsy(actual.as_ref()),
        ConditionOperator::Unknown => false,
    }
}

/// Numeric comparison. The deal side must be a number; the condition side
/// may be a number or a numeric string.
fn compare(actual: Option<&Value>, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    let Some(actual) = actual.and_then(Value::as_f64) else {
        return false;
    };
    let expected = match expected {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    expected.is_some_and(|expected| op(actual, expected))
}

/// Equality without type coercion. Integers and floats are both "numbers",
/// so `50000` equals `50000.0`.
fn strict_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f == 0.0 || f.is_nan()),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

/// String form used by `contains`, matching how the CRM front end renders
/// values: integral numbers print without a fraction.
fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Some(f) => f.to_string(),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(coerce_to_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
