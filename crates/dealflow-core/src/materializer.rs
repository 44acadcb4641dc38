//! Turning templates into per-deal automations.
//!
//! Materialization does not look at the template's condition or trigger.
//! Whether a template should be offered at all is the caller's decision,
//! made from the evaluator's report.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use dealflow_contracts::{
    automation::{Automation, AutomationStatus},
    error::DealflowResult,
    step::StepStatus,
    template::Template,
};

use crate::traits::CrmStore;

/// Build a draft automation for `deal_id` from `template`.
///
/// Every step id becomes `<template step id>-<fresh suffix>` and every step
/// starts `pending` with no timestamps, whatever the template declared.
/// Calling this twice with the same arguments yields two distinct
/// automations with disjoint step ids.
pub fn materialize(template: &Template, deal_id: &str) -> Automation {
    let now = Utc::now();

    let steps = template
        .steps
        .iter()
        .map(|step| {
            let mut step = step.clone();
            step.id = format!("{}-{}", step.id, Uuid::new_v4().simple());
            step.status = StepStatus::Pending;
            step.scheduled_at = None;
            step.completed_at = None;
            step
        })
        .collect::<Vec<_>>();

    let automation = Automation {
        id: Uuid::new_v4().to_string(),
        name: template.name.clone(),
        description: template.description.clone(),
        kind: template.kind,
        status: AutomationStatus::Draft,
        steps,
        template_id: template.id.clone(),
        deal_id: deal_id.to_string(),
        created_at: now,
        updated_at: now,
        last_run: None,
        next_run: None,
    };

    debug!(
        template_id = %template.id,
        automation_id = %automation.id,
        deal_id = %deal_id,
        steps = automation.steps.len(),
        "template materialized"
    );

    automation
}

/// Materialize `template` and persist it through `store`.
///
/// Store failures are returned unchanged. Duplicates are not detected; each
/// call creates a new automation.
pub fn materialize_into(
    store: &dyn CrmStore,
    template: &Template,
    deal_id: &str,
) -> DealflowResult<Automation> {
    let automation = materialize(template, deal_id);
    let stored = store.create_automation(automation)?;

    info!(
        template_id = %template.id,
        automation_id = %stored.id,
        deal_id = %deal_id,
        "automation created from template"
    );

    Ok(stored)
}
