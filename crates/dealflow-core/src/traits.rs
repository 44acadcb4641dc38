//! Trait definitions for the collaborators the executor depends on.
//!
//! - `CrmStore`     — the persistence/notification service (external)
//! - `MailComposer` — opens a prefilled message in the default mail handler
//! - `Clipboard`    — places text on the system clipboard
//! - `Scheduler`    — holds delay continuations until they are due
//!
//! Composer and clipboard are best-effort: the executor degrades from one to
//! the other and finally to manual copy, so implementations should simply
//! return `Err` when they are unavailable.

use serde::{Deserialize, Serialize};

use dealflow_contracts::{
    automation::{Automation, AutomationChange, AutomationPatch},
    deal::{Deal, DealPatch},
    error::DealflowResult,
    execution::Continuation,
    records::{Communication, Task},
};

/// Callback invoked for every change to a subscribed deal's automations.
pub type ChangeCallback = Box<dyn Fn(&AutomationChange) + Send + Sync>;

/// Handle returned by `CrmStore::subscribe_to_automations`.
///
/// Dropping the handle does not cancel the subscription; call
/// `unsubscribe()` to stop receiving changes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap the store-specific cancellation logic.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Stop delivering changes to the callback registered with this handle.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The persistence/notification service.
///
/// Implementations serialize their own writes; the runtime never locks
/// around calls. Any failure should be reported as
/// `DealflowError::ExternalService`.
pub trait CrmStore: Send + Sync {
    /// Persist a new automation and return the stored copy.
    fn create_automation(&self, automation: Automation) -> DealflowResult<Automation>;

    /// Apply `patch` to the automation `id` and return the updated copy.
    fn update_automation(&self, id: &str, patch: AutomationPatch) -> DealflowResult<Automation>;

    fn delete_automation(&self, id: &str) -> DealflowResult<()>;

    /// All automations attached to `deal_id`, oldest first.
    fn get_automations(&self, deal_id: &str) -> DealflowResult<Vec<Automation>>;

    /// Register `on_change` for every insert, update, and delete touching
    /// automations of `deal_id`.
    fn subscribe_to_automations(
        &self,
        deal_id: &str,
        on_change: ChangeCallback,
    ) -> DealflowResult<Subscription>;

    fn create_task(&self, task: Task) -> DealflowResult<Task>;

    fn create_communication(&self, communication: Communication) -> DealflowResult<Communication>;

    /// Used by sibling CRUD features; the executor never calls this.
    fn update_deal(&self, id: &str, patch: DealPatch) -> DealflowResult<Deal>;
}

/// An email ready to hand to a delivery surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedEmail {
    /// Display name of the recipient (the deal's contact).
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ComposedEmail {
    /// The plain-text form placed on the clipboard.
    pub fn clipboard_text(&self) -> String {
        format!("Subject: {}\n\n{}", self.subject, self.body)
    }
}

/// Opens a prefilled message in the user's mail handler.
pub trait MailComposer: Send + Sync {
    fn compose(&self, email: &ComposedEmail) -> DealflowResult<()>;
}

/// Writes text to the system clipboard.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> DealflowResult<()>;
}

/// Holds delay continuations until they are due.
///
/// Implementations decide durability. The in-memory reference
/// implementation loses everything when dropped.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, continuation: Continuation) -> DealflowResult<()>;
}
