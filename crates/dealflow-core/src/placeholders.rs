//! Placeholder substitution for step templates.
//!
//! Email and task templates replace only the FIRST occurrence of each token;
//! `"{deal} / {deal}"` becomes `"Acme / {deal}"`. Communication templates
//! replace every occurrence. Tokens without a value are left verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dealflow_contracts::deal::Deal;

/// Extra values for communication templates that describe the event which
/// triggered the automation. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerContext {
    pub old_stage: Option<String>,
    pub new_stage: Option<String>,
    pub filename: Option<String>,
    pub filesize: Option<String>,
    pub task_title: Option<String>,
    pub old_owner: Option<String>,
    pub new_owner: Option<String>,
}

/// `{deal}`, `{company}`, `{contact}` resolved from the deal.
pub fn deal_values(deal: &Deal) -> Vec<(&'static str, String)> {
    vec![
        ("{deal}", deal.title.clone()),
        ("{company}", deal.company.clone()),
        ("{contact}", deal.contact.clone()),
    ]
}

/// The full token set available to communication templates.
///
/// `{newStage}` and `{newOwner}` fall back to the deal's current stage and
/// owner; `{age}` is the deal's age in whole days.
pub fn communication_values(
    deal: &Deal,
    ctx: &TriggerContext,
    now: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let mut values = deal_values(deal);

    let optional = [
        ("{oldStage}", ctx.old_stage.clone()),
        (
            "{newStage}",
            ctx.new_stage.clone().or_else(|| Some(deal.stage.as_str().to_string())),
        ),
        ("{age}", deal.age_days(now).map(|d| d.to_string())),
        ("{filename}", ctx.filename.clone()),
        ("{filesize}", ctx.filesize.clone()),
        ("{taskTitle}", ctx.task_title.clone()),
        ("{oldOwner}", ctx.old_owner.clone()),
        ("{newOwner}", ctx.new_owner.clone().or_else(|| deal.owner.clone())),
    ];
    values.extend(optional.into_iter().filter_map(|(token, v)| v.map(|v| (token, v))));
    values
}

/// Replace the first occurrence of each token, in order.
pub fn replace_first(template: &str, values: &[(&str, String)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (token, value)| acc.replacen(token, value, 1))
}

/// Replace every occurrence of each token, in order.
pub fn replace_all(template: &str, values: &[(&str, String)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (token, value)| acc.replace(token, value))
}
