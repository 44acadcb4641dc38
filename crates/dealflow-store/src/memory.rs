//! In-memory implementation of `CrmStore`.
//!
//! `InMemoryStore` is the reference implementation of the `CrmStore` trait.
//! Every record lives in a `Mutex`-guarded state shared by all clones, so a
//! test or demo can hand one clone to the executor and keep another to
//! inspect what was written.
//!
//! Subscribers are notified after the lock is released, in registration
//! order, so a callback may call back into the store.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use dealflow_contracts::{
    automation::{Automation, AutomationChange, AutomationPatch},
    deal::{Deal, DealPatch},
    error::{DealflowError, DealflowResult},
    records::{Communication, Contact, Task},
};
use dealflow_core::traits::{ChangeCallback, CrmStore, Subscription};

type SharedCallback = Arc<dyn Fn(&AutomationChange) + Send + Sync>;

// ── Internal mutable state ────────────────────────────────────────────────────

struct Subscriber {
    id: u64,
    deal_id: String,
    callback: SharedCallback,
}

#[derive(Default)]
struct StoreState {
    /// Automations in insertion order.
    automations: Vec<Automation>,
    tasks: Vec<Task>,
    communications: Vec<Communication>,
    deals: Vec<Deal>,
    contacts: Vec<Contact>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    /// When set, every write fails with `ExternalService`.
    offline: bool,
}

// ── Public store ──────────────────────────────────────────────────────────────

/// A process-local CRM store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a deal so `update_deal` and lookups can find it.
    pub fn insert_deal(&self, deal: Deal) -> DealflowResult<()> {
        let mut state = self.lock()?;
        state.deals.retain(|d| d.id != deal.id);
        state.deals.push(deal);
        Ok(())
    }

    pub fn insert_contact(&self, contact: Contact) -> DealflowResult<()> {
        let mut state = self.lock()?;
        state.contacts.retain(|c| c.id != contact.id);
        state.contacts.push(contact);
        Ok(())
    }

    pub fn deal(&self, id: &str) -> DealflowResult<Deal> {
        self.lock()?
            .deals
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| not_found("deal", id))
    }

    pub fn contact(&self, id: &str) -> DealflowResult<Contact> {
        self.lock()?
            .contacts
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found("contact", id))
    }

    pub fn automation(&self, id: &str) -> DealflowResult<Automation> {
        self.lock()?
            .automations
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| not_found("automation", id))
    }

    /// Tasks created for `deal_id`, oldest first.
    pub fn tasks(&self, deal_id: &str) -> DealflowResult<Vec<Task>> {
        Ok(self.lock()?.tasks.iter().filter(|t| t.deal_id == deal_id).cloned().collect())
    }

    /// Communications logged for `deal_id`, oldest first.
    pub fn communications(&self, deal_id: &str) -> DealflowResult<Vec<Communication>> {
        Ok(self
            .lock()?
            .communications
            .iter()
            .filter(|c| c.deal_id == deal_id)
            .cloned()
            .collect())
    }

    /// Simulate losing the connection: every later write fails until
    /// `set_offline(false)`.
    pub fn set_offline(&self, offline: bool) -> DealflowResult<()> {
        self.lock()?.offline = offline;
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().map(|s| s.subscribers.len()).unwrap_or_default()
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn lock(&self) -> DealflowResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|e| DealflowError::external(format!("store state lock poisoned: {}", e)))
    }

    /// Lock for a write, failing if the store is offline.
    fn lock_for_write(&self) -> DealflowResult<MutexGuard<'_, StoreState>> {
        let state = self.lock()?;
        if state.offline {
            return Err(DealflowError::external("store is offline"));
        }
        Ok(state)
    }

    /// Deliver `change` to every subscriber of its deal.
    fn notify(&self, change: AutomationChange) {
        let callbacks: Vec<SharedCallback> = match self.state.lock() {
            Ok(state) => state
                .subscribers
                .iter()
                .filter(|s| s.deal_id == change.deal_id())
                .map(|s| Arc::clone(&s.callback))
                .collect(),
            Err(_) => return,
        };

        debug!(deal_id = %change.deal_id(), subscribers = callbacks.len(), "notifying subscribers");
        for callback in callbacks {
            callback(&change);
        }
    }
}

fn not_found(kind: &str, id: &str) -> DealflowError {
    DealflowError::NotFound { kind: kind.to_string(), id: id.to_string() }
}

// ── CrmStore impl ─────────────────────────────────────────────────────────────

impl CrmStore for InMemoryStore {
    fn create_automation(&self, automation: Automation) -> DealflowResult<Automation> {
        {
            let mut state = self.lock_for_write()?;
            if state.automations.iter().any(|a| a.id == automation.id) {
                return Err(DealflowError::Validation {
                    reason: format!("automation '{}' already exists", automation.id),
                });
            }
            state.automations.push(automation.clone());
        }

        info!(automation_id = %automation.id, deal_id = %automation.deal_id, "automation stored");
        self.notify(AutomationChange::Insert { automation: automation.clone() });
        Ok(automation)
    }

    fn update_automation(&self, id: &str, patch: AutomationPatch) -> DealflowResult<Automation> {
        let updated = {
            let mut state = self.lock_for_write()?;
            let automation = state
                .automations
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| not_found("automation", id))?;
            patch.apply_to(automation);
            automation.updated_at = Utc::now();
            automation.clone()
        };

        debug!(automation_id = %id, "automation updated");
        self.notify(AutomationChange::Update { automation: updated.clone() });
        Ok(updated)
    }

    fn delete_automation(&self, id: &str) -> DealflowResult<()> {
        let removed = {
            let mut state = self.lock_for_write()?;
            let index = state
                .automations
                .iter()
                .position(|a| a.id == id)
                .ok_or_else(|| not_found("automation", id))?;
            state.automations.remove(index)
        };

        info!(automation_id = %id, "automation deleted");
        self.notify(AutomationChange::Delete { id: removed.id, deal_id: removed.deal_id });
        Ok(())
    }

    fn get_automations(&self, deal_id: &str) -> DealflowResult<Vec<Automation>> {
        Ok(self
            .lock()?
            .automations
            .iter()
            .filter(|a| a.deal_id == deal_id)
            .cloned()
            .collect())
    }

    fn subscribe_to_automations(
        &self,
        deal_id: &str,
        on_change: ChangeCallback,
    ) -> DealflowResult<Subscription> {
        let id = {
            let mut state = self.lock()?;
            let id = state.next_subscriber;
            state.next_subscriber += 1;
            state.subscribers.push(Subscriber {
                id,
                deal_id: deal_id.to_string(),
                callback: Arc::from(on_change),
            });
            id
        };
        debug!(deal_id = %deal_id, subscriber = id, "automation subscription opened");

        let state = Arc::clone(&self.state);
        Ok(Subscription::new(move || {
            if let Ok(mut state) = state.lock() {
                state.subscribers.retain(|s| s.id != id);
            }
        }))
    }

    fn create_task(&self, task: Task) -> DealflowResult<Task> {
        self.lock_for_write()?.tasks.push(task.clone());
        Ok(task)
    }

    fn create_communication(&self, communication: Communication) -> DealflowResult<Communication> {
        self.lock_for_write()?.communications.push(communication.clone());
        Ok(communication)
    }

    fn update_deal(&self, id: &str, patch: DealPatch) -> DealflowResult<Deal> {
        let mut state = self.lock_for_write()?;
        let deal = state
            .deals
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| not_found("deal", id))?;
        patch.apply_to(deal);
        deal.updated_at = Some(Utc::now());
        Ok(deal.clone())
    }
}
