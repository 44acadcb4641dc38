//! User-driven automation status changes.

use tracing::info;

use dealflow_contracts::{
    automation::{Automation, AutomationPatch, AutomationStatus},
    error::{DealflowError, DealflowResult},
};

use crate::traits::CrmStore;

/// Move `automation` to `target` and persist the change.
///
/// Only `draft → active`, `active ⇄ paused` and `active → completed` are
/// allowed; anything else returns `DealflowError::InvalidTransition` without
/// touching the store.
pub fn transition(
    store: &dyn CrmStore,
    automation: &Automation,
    target: AutomationStatus,
) -> DealflowResult<Automation> {
    if !automation.status.can_transition_to(target) {
        return Err(DealflowError::InvalidTransition {
            id: automation.id.clone(),
            from: automation.status.as_str().to_string(),
            to: target.as_str().to_string(),
        });
    }

    let updated = store.update_automation(&automation.id, AutomationPatch::status(target))?;
    info!(
        automation_id = %automation.id,
        from = automation.status.as_str(),
        to = target.as_str(),
        "automation status changed"
    );
    Ok(updated)
}

pub fn activate(store: &dyn CrmStore, automation: &Automation) -> DealflowResult<Automation> {
    transition(store, automation, AutomationStatus::Active)
}

pub fn pause(store: &dyn CrmStore, automation: &Automation) -> DealflowResult<Automation> {
    transition(store, automation, AutomationStatus::Paused)
}

pub fn complete(store: &dyn CrmStore, automation: &Automation) -> DealflowResult<Automation> {
    transition(store, automation, AutomationStatus::Completed)
}
