//! The DEALFLOW step executor.
//!
//! Runs one step of a materialized automation at a time:
//!
//!   mark active → side effect → mark completed | failed
//!
//! Delay steps are the exception. They hand a continuation for the next step
//! to the scheduler and return immediately, leaving their own status alone.
//!
//! Step failures never escape as `Err`. They are recorded on the step,
//! logged, and returned as `StepOutcome::Failed`; nothing is retried and the
//! automation's own status is left untouched.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use dealflow_contracts::{
    automation::{Automation, AutomationPatch, AutomationStatus},
    deal::Deal,
    error::{DealflowError, DealflowResult},
    execution::{Continuation, Delivery, StepOutcome},
    records::{Communication, CommunicationType, Task},
    step::{StepAction, StepStatus},
};

use crate::{
    config::ExecutorConfig,
    placeholders::{communication_values, deal_values, replace_all, replace_first, TriggerContext},
    traits::{Clipboard, ComposedEmail, CrmStore, MailComposer, Scheduler},
};

/// Drives the steps of automations against the external collaborators.
///
/// One executor can serve any number of automations; it keeps no
/// per-automation state of its own.
pub struct StepExecutor {
    store: Box<dyn CrmStore>,
    composer: Box<dyn MailComposer>,
    clipboard: Box<dyn Clipboard>,
    scheduler: Box<dyn Scheduler>,
    config: ExecutorConfig,
}

impl StepExecutor {
    pub fn new(
        store: Box<dyn CrmStore>,
        composer: Box<dyn MailComposer>,
        clipboard: Box<dyn Clipboard>,
        scheduler: Box<dyn Scheduler>,
        config: ExecutorConfig,
    ) -> Self {
        Self { store, composer, clipboard, scheduler, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute step `step_index` of `automation` for `deal`.
    ///
    /// Equivalent to `execute_step_with` with an empty `TriggerContext`.
    pub fn execute_step(&self, automation: &Automation, step_index: usize, deal: &Deal) -> StepOutcome {
        self.execute_step_with(automation, step_index, deal, &TriggerContext::default())
    }

    /// Execute one step, resolving communication placeholders from `ctx`.
    ///
    /// # Dispatch
    ///
    /// - `email`         — substitute, compose, deliver, log a communication
    /// - `task`          — substitute the title, create a pending task
    /// - `communication` — substitute the content, log a communication
    /// - `attachment`, `call`, `ai` — logged only
    /// - `delay`         — schedule `step_index + 1`, return `Deferred`
    pub fn execute_step_with(
        &self,
        automation: &Automation,
        step_index: usize,
        deal: &Deal,
        ctx: &TriggerContext,
    ) -> StepOutcome {
        let mut working = automation.clone();
        self.run_step(&mut working, step_index, deal, ctx)
    }

    /// Run steps from `start` in index order until one fails, one defers,
    /// or the automation ends. Returns the outcome of every step attempted.
    pub fn run_sequence(&self, automation: &Automation, start: usize, deal: &Deal) -> Vec<StepOutcome> {
        let ctx = TriggerContext::default();
        let mut working = automation.clone();
        let mut outcomes = Vec::new();

        for index in start..working.steps.len() {
            let outcome = self.run_step(&mut working, index, deal, &ctx);
            let keep_going = outcome.is_completed();
            outcomes.push(outcome);
            if !keep_going {
                break;
            }
        }

        outcomes
    }

    /// Run the step a fired continuation points at.
    ///
    /// The latest stored copy of the automation is used, so statuses written
    /// since the delay was scheduled are respected. Returns `Ok(None)` when
    /// the automation no longer exists or has been paused or completed.
    pub fn resume(&self, continuation: &Continuation) -> DealflowResult<Option<StepOutcome>> {
        let automations = self.store.get_automations(&continuation.deal.id)?;
        let Some(automation) = automations.into_iter().find(|a| a.id == continuation.automation_id)
        else {
            warn!(
                automation_id = %continuation.automation_id,
                step_index = continuation.step_index,
                "continuation fired for a missing automation, dropping"
            );
            return Ok(None);
        };

        if matches!(automation.status, AutomationStatus::Paused | AutomationStatus::Completed) {
            info!(
                automation_id = %automation.id,
                status = automation.status.as_str(),
                step_index = continuation.step_index,
                "automation not running, continuation dropped"
            );
            return Ok(None);
        }

        Ok(Some(self.execute_step(&automation, continuation.step_index, &continuation.deal)))
    }

    /// Rebuild and reschedule continuations persisted for `deal`'s
    /// automations.
    ///
    /// Only has anything to find when `durable_scheduling` was on when the
    /// delays ran. With it off, continuations die with the scheduler and this
    /// returns an empty list.
    pub fn recover(&self, deal: &Deal) -> DealflowResult<Vec<Continuation>> {
        if !self.config.durable_scheduling {
            debug!(deal_id = %deal.id, "durable scheduling disabled, nothing to recover");
            return Ok(Vec::new());
        }

        let mut recovered = Vec::new();
        for automation in self.store.get_automations(&deal.id)? {
            if !matches!(automation.status, AutomationStatus::Draft | AutomationStatus::Active) {
                continue;
            }
            let Some(due_at) = automation.next_run else {
                continue;
            };
            let pending = automation
                .steps
                .iter()
                .position(|s| s.status == StepStatus::Pending && s.scheduled_at == Some(due_at));

            if let Some(step_index) = pending {
                let continuation = Continuation {
                    automation_id: automation.id.clone(),
                    step_index,
                    due_at,
                    deal: deal.clone(),
                };
                self.scheduler.schedule(continuation.clone())?;
                info!(
                    automation_id = %automation.id,
                    step_index,
                    due_at = %due_at,
                    "recovered scheduled step"
                );
                recovered.push(continuation);
            }
        }

        Ok(recovered)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Run one step against `automation`, keeping the local copy in step with
    /// what was written to the store.
    fn run_step(
        &self,
        automation: &mut Automation,
        step_index: usize,
        deal: &Deal,
        ctx: &TriggerContext,
    ) -> StepOutcome {
        let Some(step) = automation.steps.get(step_index).cloned() else {
            warn!(
                automation_id = %automation.id,
                step_index,
                step_count = automation.steps.len(),
                "step index out of range"
            );
            return StepOutcome::NotFound { step_index };
        };

        debug!(
            automation_id = %automation.id,
            step_id = %step.id,
            step_type = step.action.type_name(),
            step_index,
            "executing step"
        );

        if let StepAction::Delay { delay_days } = step.action {
            return match self.defer(automation, step_index, delay_days, deal) {
                Ok(continuation) => StepOutcome::Deferred { step_id: step.id, continuation },
                Err(err) => {
                    self.record_status(automation, step_index, StepStatus::Failed);
                    warn!(step_id = %step.id, error = %err, "delay step could not be scheduled");
                    StepOutcome::Failed { step_id: step.id, reason: err.to_string() }
                }
            };
        }

        self.record_status(automation, step_index, StepStatus::Active);

        let result = match &step.action {
            StepAction::Email { email_subject, email_body } => self
                .send_email(
                    deal,
                    email_subject.as_deref().unwrap_or_default(),
                    email_body.as_deref().unwrap_or_default(),
                )
                .map(Some),
            StepAction::Task { task_title, task_priority } => {
                let title = replace_first(task_title, &deal_values(deal));
                let mut task = Task::pending(&deal.id, title, *task_priority);
                task.description = step.details.clone();
                self.store.create_task(task).map(|task| {
                    info!(task_id = %task.id, deal_id = %deal.id, "task created by automation");
                    None
                })
            }
            StepAction::Communication { communication_type, communication_content } => {
                let values = communication_values(deal, ctx, Utc::now());
                let content = replace_all(communication_content, &values);
                let communication = Communication::outbound(&deal.id, *communication_type, None, content);
                self.store.create_communication(communication).map(|_| None)
            }
            StepAction::Attachment { attachment_name, attachment_type } => {
                info!(
                    deal_id = %deal.id,
                    attachment = %attachment_name,
                    attachment_type = %attachment_type,
                    "attachment step logged"
                );
                Ok(None)
            }
            StepAction::Call | StepAction::Ai => {
                info!(
                    deal_id = %deal.id,
                    step_type = step.action.type_name(),
                    step = %step.name,
                    "manual step logged"
                );
                Ok(None)
            }
            StepAction::Delay { .. } => Ok(None),
        };

        match result {
            Ok(delivery) => {
                let persisted = self.record_status(automation, step_index, StepStatus::Completed);
                info!(automation_id = %automation.id, step_id = %step.id, persisted, "step completed");
                StepOutcome::Completed { step_id: step.id, delivery, persisted }
            }
            Err(err) => {
                self.record_status(automation, step_index, StepStatus::Failed);
                warn!(
                    automation_id = %automation.id,
                    step_id = %step.id,
                    error = %err,
                    "step failed"
                );
                StepOutcome::Failed { step_id: step.id, reason: err.to_string() }
            }
        }
    }

    /// Compose, deliver, and log an email step.
    fn send_email(&self, deal: &Deal, subject: &str, body: &str) -> DealflowResult<Delivery> {
        let values = deal_values(deal);
        let subject = replace_first(subject, &values);
        let body = replace_first(body, &values);

        if subject.trim().is_empty() {
            return Err(DealflowError::EmptyContent { field: "subject".to_string() });
        }
        if body.trim().is_empty() {
            return Err(DealflowError::EmptyContent { field: "body".to_string() });
        }

        let email = ComposedEmail { to: deal.contact.clone(), subject, body };
        let delivery = self.deliver(&email);

        self.store.create_communication(Communication::outbound(
            &deal.id,
            CommunicationType::Email,
            Some(email.subject),
            email.body,
        ))?;

        Ok(delivery)
    }

    /// Composer first, then clipboard, then manual copy.
    fn deliver(&self, email: &ComposedEmail) -> Delivery {
        let composer_err = match self.composer.compose(email) {
            Ok(()) => return Delivery::Composer,
            Err(e) => e,
        };
        debug!(error = %composer_err, "mail composer unavailable, trying clipboard");

        let text = email.clipboard_text();
        match self.clipboard.write_text(&text) {
            Ok(()) => Delivery::Clipboard,
            Err(clipboard_err) => {
                let err = DealflowError::DeliveryUnavailable {
                    reason: format!("composer: {}; clipboard: {}", composer_err, clipboard_err),
                };
                warn!(error = %err, "email left for manual copy");
                Delivery::Manual { content: text }
            }
        }
    }

    /// Schedule the step after a delay.
    fn defer(
        &self,
        automation: &mut Automation,
        step_index: usize,
        delay_days: u32,
        deal: &Deal,
    ) -> DealflowResult<Continuation> {
        let now = Utc::now();
        let due_at = now
            .checked_add_signed(self.config.delay_for(delay_days))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let continuation = Continuation {
            automation_id: automation.id.clone(),
            step_index: step_index + 1,
            due_at,
            deal: deal.clone(),
        };
        self.scheduler.schedule(continuation.clone())?;

        info!(
            automation_id = %automation.id,
            next_step_index = step_index + 1,
            delay_days,
            due_at = %due_at,
            "next step scheduled"
        );

        if self.config.durable_scheduling {
            self.refresh_steps(automation);
            if let Some(next) = automation.steps.get_mut(step_index + 1) {
                next.scheduled_at = Some(due_at);
            }
            automation.next_run = Some(due_at);
            let patch = AutomationPatch {
                steps: Some(automation.steps.clone()),
                next_run: Some(due_at),
                ..AutomationPatch::default()
            };
            if let Err(err) = self.store.update_automation(&automation.id, patch) {
                warn!(
                    automation_id = %automation.id,
                    error = %err,
                    "failed to persist schedule; continuation is memory-only"
                );
            }
        }

        Ok(continuation)
    }

    /// Replace the local step list with the stored one so a write only
    /// changes the step being run. Callers may hold an automation that is
    /// older than the store; statuses saved since then must survive.
    fn refresh_steps(&self, automation: &mut Automation) {
        let stored = match self.store.get_automations(&automation.deal_id) {
            Ok(all) => all.into_iter().find(|a| a.id == automation.id),
            Err(err) => {
                debug!(automation_id = %automation.id, error = %err, "could not re-read automation");
                None
            }
        };
        if let Some(stored) = stored {
            if stored.steps.len() == automation.steps.len() {
                automation.steps = stored.steps;
            }
        }
    }

    /// Set a step's status and write it through the store.
    ///
    /// Returns whether the write succeeded. A store failure is logged, not
    /// raised: the local copy still advances so the outcome reflects what
    /// actually happened.
    fn record_status(&self, automation: &mut Automation, step_index: usize, status: StepStatus) -> bool {
        let now = Utc::now();
        self.refresh_steps(automation);
        let Some(step) = automation.steps.get_mut(step_index) else {
            return false;
        };
        step.status = status;
        if status == StepStatus::Completed {
            step.completed_at = Some(now);
        }

        let mut patch = AutomationPatch::steps(automation.steps.clone());
        if status != StepStatus::Active {
            automation.last_run = Some(now);
            patch.last_run = Some(now);
        }

        match self.store.update_automation(&automation.id, patch) {
            Ok(stored) => {
                automation.updated_at = stored.updated_at;
                true
            }
            Err(err) => {
                warn!(
                    automation_id = %automation.id,
                    step_index,
                    status = ?status,
                    error = %err,
                    "failed to persist step status"
                );
                false
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, Utc};

    use dealflow_contracts::{
        automation::{Automation, AutomationChange, AutomationPatch, AutomationStatus},
        deal::{Deal, DealPatch, DealStage, Priority},
        error::{DealflowError, DealflowResult},
        execution::{Continuation, Delivery, StepOutcome},
        records::{Communication, CommunicationType, Task, TaskStatus},
        step::{Step, StepAction, StepStatus},
        template::{Template, TemplateType},
    };

    use crate::{
        config::ExecutorConfig,
        materializer::materialize,
        traits::{ChangeCallback, Clipboard, ComposedEmail, CrmStore, MailComposer, Scheduler, Subscription},
    };

    use super::StepExecutor;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct StoreState {
        automations: HashMap<String, Automation>,
        tasks: Vec<Task>,
        communications: Vec<Communication>,
        fail_writes: bool,
        fail_updates: bool,
    }

    /// A store that records every write for later inspection.
    #[derive(Clone, Default)]
    struct MockStore {
        state: Arc<Mutex<StoreState>>,
    }

    impl MockStore {
        fn with(automation: &Automation) -> Self {
            let store = Self::default();
            store.create_automation(automation.clone()).unwrap();
            store
        }

        fn automation(&self, id: &str) -> Automation {
            self.state.lock().unwrap().automations[id].clone()
        }

        fn tasks(&self) -> Vec<Task> {
            self.state.lock().unwrap().tasks.clone()
        }

        fn communications(&self) -> Vec<Communication> {
            self.state.lock().unwrap().communications.clone()
        }

        fn fail_writes(&self) {
            self.state.lock().unwrap().fail_writes = true;
        }

        fn fail_updates(&self) {
            self.state.lock().unwrap().fail_updates = true;
        }
    }

    impl CrmStore for MockStore {
        fn create_automation(&self, automation: Automation) -> DealflowResult<Automation> {
            self.state
                .lock()
                .unwrap()
                .automations
                .insert(automation.id.clone(), automation.clone());
            Ok(automation)
        }

        fn update_automation(&self, id: &str, patch: AutomationPatch) -> DealflowResult<Automation> {
            let mut state = self.state.lock().unwrap();
            if state.fail_updates {
                return Err(DealflowError::external("write timed out"));
            }
            let automation = state.automations.get_mut(id).ok_or_else(|| DealflowError::NotFound {
                kind: "automation".to_string(),
                id: id.to_string(),
            })?;
            patch.apply_to(automation);
            automation.updated_at = Utc::now();
            Ok(automation.clone())
        }

        fn delete_automation(&self, id: &str) -> DealflowResult<()> {
            self.state.lock().unwrap().automations.remove(id);
            Ok(())
        }

        fn get_automations(&self, deal_id: &str) -> DealflowResult<Vec<Automation>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .automations
                .values()
                .filter(|a| a.deal_id == deal_id)
                .cloned()
                .collect())
        }

        fn subscribe_to_automations(
            &self,
            _deal_id: &str,
            _on_change: ChangeCallback,
        ) -> DealflowResult<Subscription> {
            Ok(Subscription::new(|| {}))
        }

        fn create_task(&self, task: Task) -> DealflowResult<Task> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(DealflowError::external("connection reset"));
            }
            state.tasks.push(task.clone());
            Ok(task)
        }

        fn create_communication(&self, communication: Communication) -> DealflowResult<Communication> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(DealflowError::external("connection reset"));
            }
            state.communications.push(communication.clone());
            Ok(communication)
        }

        fn update_deal(&self, id: &str, _patch: DealPatch) -> DealflowResult<Deal> {
            Err(DealflowError::NotFound { kind: "deal".to_string(), id: id.to_string() })
        }
    }

    /// A composer that is either available (recording) or blocked.
    #[derive(Clone)]
    struct MockComposer {
        available: bool,
        sent: Arc<Mutex<Vec<ComposedEmail>>>,
    }

    impl MockComposer {
        fn available() -> Self {
            Self { available: true, sent: Arc::new(Mutex::new(vec![])) }
        }

        fn blocked() -> Self {
            Self { available: false, sent: Arc::new(Mutex::new(vec![])) }
        }
    }

    impl MailComposer for MockComposer {
        fn compose(&self, email: &ComposedEmail) -> DealflowResult<()> {
            if !self.available {
                return Err(DealflowError::external("popup blocked"));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    #[derive(Clone)]
    struct MockClipboard {
        available: bool,
        text: Arc<Mutex<Option<String>>>,
    }

    impl MockClipboard {
        fn new(available: bool) -> Self {
            Self { available, text: Arc::new(Mutex::new(None)) }
        }
    }

    impl Clipboard for MockClipboard {
        fn write_text(&self, text: &str) -> DealflowResult<()> {
            if !self.available {
                return Err(DealflowError::external("clipboard permission denied"));
            }
            *self.text.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockScheduler {
        scheduled: Arc<Mutex<Vec<Continuation>>>,
    }

    impl Scheduler for MockScheduler {
        fn schedule(&self, continuation: Continuation) -> DealflowResult<()> {
            self.scheduled.lock().unwrap().push(continuation);
            Ok(())
        }
    }

    fn make_deal() -> Deal {
        Deal {
            id: "deal-42".to_string(),
            title: "Fleet renewal".to_string(),
            company: "Initech".to_string(),
            contact: "Peter Gibbons".to_string(),
            value: 75_000.0,
            stage: DealStage::Qualification,
            priority: Priority::High,
            probability: 35.0,
            owner: Some("bill".to_string()),
            expected_close_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn make_automation(steps: Vec<Step>) -> Automation {
        let template = Template {
            id: "test-template".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            kind: TemplateType::Drip,
            condition: None,
            trigger: None,
            steps,
        };
        materialize(&template, "deal-42")
    }

    fn email(subject: Option<&str>, body: Option<&str>) -> Step {
        Step::new(
            "email",
            "Email",
            StepAction::Email {
                email_subject: subject.map(str::to_string),
                email_body: body.map(str::to_string),
            },
        )
    }

    fn executor_with(
        store: &MockStore,
        composer: MockComposer,
        clipboard: MockClipboard,
        scheduler: &MockScheduler,
        config: ExecutorConfig,
    ) -> StepExecutor {
        StepExecutor::new(
            Box::new(store.clone()),
            Box::new(composer),
            Box::new(clipboard),
            Box::new(scheduler.clone()),
            config,
        )
    }

    fn executor(store: &MockStore, scheduler: &MockScheduler) -> StepExecutor {
        executor_with(
            store,
            MockComposer::available(),
            MockClipboard::new(true),
            scheduler,
            ExecutorConfig::default(),
        )
    }

    // ── Email ────────────────────────────────────────────────────────────────

    #[test]
    fn email_step_composes_and_logs_communication() {
        let automation = make_automation(vec![email(Some("Next steps on {deal}"), Some("Hi {contact}"))]);
        let store = MockStore::with(&automation);
        let composer = MockComposer::available();
        let sent = composer.sent.clone();
        let scheduler = MockScheduler::default();
        let exec = executor_with(&store, composer, MockClipboard::new(true), &scheduler, ExecutorConfig::default());

        let outcome = exec.execute_step(&automation, 0, &make_deal());

        match outcome {
            StepOutcome::Completed { delivery, .. } => assert_eq!(delivery, Some(Delivery::Composer)),
            other => panic!("expected Completed, got {:?}", other),
        }
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0].subject, "Next steps on Fleet renewal");
        assert_eq!(sent[0].body, "Hi Peter Gibbons");

        let comms = store.communications();
        assert_eq!(comms.len(), 1);
        assert_eq!(comms[0].kind, CommunicationType::Email);
        assert_eq!(comms[0].subject.as_deref(), Some("Next steps on Fleet renewal"));

        let stored = store.automation(&automation.id);
        assert_eq!(stored.steps[0].status, StepStatus::Completed);
        assert!(stored.steps[0].completed_at.is_some());
        assert!(stored.last_run.is_some());
    }

    #[test]
    fn email_without_subject_fails_with_empty_content() {
        let automation = make_automation(vec![email(None, Some("Body"))]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());

        match outcome {
            StepOutcome::Failed { reason, .. } => assert!(reason.contains("subject"), "reason: {reason}"),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(store.automation(&automation.id).steps[0].status, StepStatus::Failed);
        assert!(store.communications().is_empty(), "nothing is logged for an empty email");
    }

    #[test]
    fn whitespace_body_is_empty_content() {
        let automation = make_automation(vec![email(Some("Subject"), Some("   \n"))]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());
        match outcome {
            StepOutcome::Failed { reason, .. } => assert!(reason.contains("body"), "reason: {reason}"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn blocked_composer_falls_back_to_clipboard() {
        let automation = make_automation(vec![email(Some("Re: {company}"), Some("Hello"))]);
        let store = MockStore::with(&automation);
        let clipboard = MockClipboard::new(true);
        let text = clipboard.text.clone();
        let scheduler = MockScheduler::default();
        let exec = executor_with(&store, MockComposer::blocked(), clipboard, &scheduler, ExecutorConfig::default());

        let outcome = exec.execute_step(&automation, 0, &make_deal());

        assert_eq!(
            outcome,
            StepOutcome::Completed {
                step_id: automation.steps[0].id.clone(),
                delivery: Some(Delivery::Clipboard),
                persisted: true,
            }
        );
        assert_eq!(text.lock().unwrap().as_deref(), Some("Subject: Re: Initech\n\nHello"));
        assert_eq!(store.communications().len(), 1);
    }

    #[test]
    fn no_surface_leaves_manual_copy_and_still_logs() {
        let automation = make_automation(vec![email(Some("Hi"), Some("There"))]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();
        let exec = executor_with(
            &store,
            MockComposer::blocked(),
            MockClipboard::new(false),
            &scheduler,
            ExecutorConfig::default(),
        );

        match exec.execute_step(&automation, 0, &make_deal()) {
            StepOutcome::Completed { delivery: Some(Delivery::Manual { content }), .. } => {
                assert_eq!(content, "Subject: Hi\n\nThere");
            }
            other => panic!("expected manual delivery, got {:?}", other),
        }
        assert_eq!(store.communications().len(), 1);
    }

    #[test]
    fn repeated_token_is_substituted_once() {
        let automation = make_automation(vec![email(Some("{deal} / {deal}"), Some("x"))]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());

        let comms = store.communications();
        assert_eq!(comms[0].subject.as_deref(), Some("Fleet renewal / {deal}"));
    }

    // ── Task / communication / logged-only steps ─────────────────────────────

    #[test]
    fn task_step_creates_pending_task_with_priority() {
        let step = Step::new(
            "task",
            "Prep",
            StepAction::Task {
                task_title: "Prepare proposal for {company}".to_string(),
                task_priority: Priority::High,
            },
        );
        let automation = make_automation(vec![step]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());

        assert!(outcome.is_completed());
        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Prepare proposal for Initech");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[0].deal_id, "deal-42");
    }

    #[test]
    fn communication_step_logs_outbound_record() {
        let step = Step::new(
            "log",
            "Log stage change",
            StepAction::Communication {
                communication_type: CommunicationType::Note,
                communication_content: "{deal} moved to {newStage} ({company}, {company})".to_string(),
            },
        );
        let automation = make_automation(vec![step]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());

        assert!(outcome.is_completed());
        let comms = store.communications();
        assert_eq!(comms[0].content, "Fleet renewal moved to qualification (Initech, Initech)");
        assert_eq!(comms[0].direction, dealflow_contracts::records::Direction::Outbound);
    }

    #[test]
    fn attachment_step_is_logged_only() {
        let step = Step::new(
            "doc",
            "Attach brochure",
            StepAction::Attachment {
                attachment_name: "brochure.pdf".to_string(),
                attachment_type: "pdf".to_string(),
            },
        );
        let automation = make_automation(vec![step]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());

        assert!(outcome.is_completed());
        assert!(store.tasks().is_empty());
        assert!(store.communications().is_empty());
    }

    #[test]
    fn store_failure_marks_step_failed_without_advancing() {
        let task = Step::new(
            "task",
            "Task",
            StepAction::Task { task_title: "Call".to_string(), task_priority: Priority::Low },
        );
        let automation = make_automation(vec![task, Step::new("call", "Call", StepAction::Call)]);
        let store = MockStore::with(&automation);
        store.fail_writes();
        let scheduler = MockScheduler::default();

        let outcomes = executor(&store, &scheduler).run_sequence(&automation, 0, &make_deal());

        assert_eq!(outcomes.len(), 1, "sequence stops at the failed step");
        assert!(outcomes[0].is_failed());
        let stored = store.automation(&automation.id);
        assert_eq!(stored.steps[0].status, StepStatus::Failed);
        assert_eq!(stored.steps[1].status, StepStatus::Pending);
        assert_eq!(stored.status, AutomationStatus::Draft, "automation status is untouched");
    }

    #[test]
    fn out_of_range_index_is_not_found() {
        let automation = make_automation(vec![Step::new("call", "Call", StepAction::Call)]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 5, &make_deal());
        assert_eq!(outcome, StepOutcome::NotFound { step_index: 5 });
    }

    // ── Delay ────────────────────────────────────────────────────────────────

    #[test]
    fn delay_schedules_next_step_and_stays_pending() {
        let automation = make_automation(vec![
            Step::new("wait", "Wait", StepAction::Delay { delay_days: 3 }),
            Step::new("call", "Call", StepAction::Call),
        ]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();
        let before = Utc::now();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());

        let continuation = match outcome {
            StepOutcome::Deferred { continuation, .. } => continuation,
            other => panic!("expected Deferred, got {:?}", other),
        };
        assert_eq!(continuation.step_index, 1);
        assert!(continuation.due_at >= before + Duration::days(3));
        assert!(continuation.due_at <= Utc::now() + Duration::days(3));

        assert_eq!(scheduler.scheduled.lock().unwrap().len(), 1);

        let stored = store.automation(&automation.id);
        assert_eq!(stored.steps[0].status, StepStatus::Pending, "delay never completes itself");
        assert_eq!(stored.steps[1].status, StepStatus::Pending, "next step has not run yet");
        assert!(stored.next_run.is_none(), "nothing persisted without durable scheduling");
    }

    #[test]
    fn sequence_stops_at_delay() {
        let automation = make_automation(vec![
            Step::new("call", "Call", StepAction::Call),
            Step::new("wait", "Wait", StepAction::Delay { delay_days: 1 }),
            Step::new("ai", "Draft", StepAction::Ai),
        ]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        let outcomes = executor(&store, &scheduler).run_sequence(&automation, 0, &make_deal());

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_completed());
        assert!(matches!(outcomes[1], StepOutcome::Deferred { .. }));

        let stored = store.automation(&automation.id);
        assert_eq!(stored.steps[0].status, StepStatus::Completed);
        assert_eq!(stored.steps[2].status, StepStatus::Pending);
    }

    #[test]
    fn resume_runs_the_scheduled_step() {
        let automation = make_automation(vec![
            Step::new("wait", "Wait", StepAction::Delay { delay_days: 1 }),
            Step::new(
                "task",
                "Check in",
                StepAction::Task { task_title: "Check in with {contact}".to_string(), task_priority: Priority::Medium },
            ),
        ]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();
        let exec = executor(&store, &scheduler);

        exec.execute_step(&automation, 0, &make_deal());
        let continuation = scheduler.scheduled.lock().unwrap()[0].clone();

        let outcome = exec.resume(&continuation).unwrap().expect("automation still exists");

        assert!(outcome.is_completed());
        assert_eq!(store.tasks()[0].title, "Check in with Peter Gibbons");
        assert_eq!(store.automation(&automation.id).steps[1].status, StepStatus::Completed);
    }

    #[test]
    fn resume_drops_continuation_for_paused_or_deleted_automation() {
        let automation = make_automation(vec![
            Step::new("wait", "Wait", StepAction::Delay { delay_days: 1 }),
            Step::new("call", "Call", StepAction::Call),
        ]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();
        let exec = executor(&store, &scheduler);

        exec.execute_step(&automation, 0, &make_deal());
        let continuation = scheduler.scheduled.lock().unwrap()[0].clone();

        store
            .update_automation(&automation.id, AutomationPatch::status(AutomationStatus::Paused))
            .unwrap();
        assert!(exec.resume(&continuation).unwrap().is_none());

        store.delete_automation(&automation.id).unwrap();
        assert!(exec.resume(&continuation).unwrap().is_none());
    }

    #[test]
    fn durable_scheduling_persists_and_recovers() {
        let automation = make_automation(vec![
            Step::new("wait", "Wait", StepAction::Delay { delay_days: 2 }),
            Step::new("call", "Call", StepAction::Call),
        ]);
        let store = MockStore::with(&automation);
        let config = ExecutorConfig { durable_scheduling: true, ..ExecutorConfig::default() };

        let first = MockScheduler::default();
        let exec = executor_with(&store, MockComposer::available(), MockClipboard::new(true), &first, config.clone());
        exec.execute_step(&automation, 0, &make_deal());
        let due_at = first.scheduled.lock().unwrap()[0].due_at;

        let stored = store.automation(&automation.id);
        assert_eq!(stored.next_run, Some(due_at));
        assert_eq!(stored.steps[1].scheduled_at, Some(due_at));

        // A fresh scheduler stands in for a restarted process.
        let second = MockScheduler::default();
        let restarted = executor_with(&store, MockComposer::available(), MockClipboard::new(true), &second, config);
        let recovered = restarted.recover(&make_deal()).unwrap();

        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].step_index, 1);
        assert_eq!(recovered[0].due_at, due_at);
        assert_eq!(second.scheduled.lock().unwrap().len(), 1);
    }

    #[test]
    fn recover_without_durable_scheduling_finds_nothing() {
        let automation = make_automation(vec![
            Step::new("wait", "Wait", StepAction::Delay { delay_days: 2 }),
            Step::new("call", "Call", StepAction::Call),
        ]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();
        let exec = executor(&store, &scheduler);

        exec.execute_step(&automation, 0, &make_deal());
        assert!(exec.recover(&make_deal()).unwrap().is_empty());
    }

    #[test]
    fn executor_runs_against_store_with_inert_subscriptions() {
        let automation = make_automation(vec![Step::new("call", "Call", StepAction::Call)]);
        let store = MockStore::with(&automation);
        let sub = store
            .subscribe_to_automations("deal-42", Box::new(|_change: &AutomationChange| {}))
            .unwrap();
        let scheduler = MockScheduler::default();

        let outcome = executor(&store, &scheduler).execute_step(&automation, 0, &make_deal());

        assert!(outcome.is_completed());
        assert_eq!(store.automation(&automation.id).steps[0].status, StepStatus::Completed);
        sub.unsubscribe();
    }

    // ── Stale copies and persistence failures ────────────────────────────────

    #[test]
    fn stale_automation_copy_keeps_earlier_step_status() {
        let automation = make_automation(vec![
            Step::new("call", "Call", StepAction::Call),
            Step::new("ai", "Draft", StepAction::Ai),
        ]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();
        let exec = executor(&store, &scheduler);

        // Both calls use the copy returned at materialization time.
        assert!(exec.execute_step(&automation, 0, &make_deal()).is_completed());
        assert!(exec.execute_step(&automation, 1, &make_deal()).is_completed());

        let stored = store.automation(&automation.id);
        assert_eq!(stored.steps[0].status, StepStatus::Completed);
        assert_eq!(stored.steps[1].status, StepStatus::Completed);
        assert!(stored.steps[0].completed_at.is_some());
    }

    #[test]
    fn durable_delay_on_stale_copy_keeps_earlier_step_status() {
        let automation = make_automation(vec![
            Step::new("call", "Call", StepAction::Call),
            Step::new("wait", "Wait", StepAction::Delay { delay_days: 1 }),
            Step::new("ai", "Draft", StepAction::Ai),
        ]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();
        let config = ExecutorConfig { durable_scheduling: true, ..ExecutorConfig::default() };
        let exec = executor_with(&store, MockComposer::available(), MockClipboard::new(true), &scheduler, config);

        exec.execute_step(&automation, 0, &make_deal());
        let outcome = exec.execute_step(&automation, 1, &make_deal());
        assert!(matches!(outcome, StepOutcome::Deferred { .. }));

        let stored = store.automation(&automation.id);
        assert_eq!(stored.steps[0].status, StepStatus::Completed);
        assert!(stored.steps[2].scheduled_at.is_some());
    }

    #[test]
    fn failed_status_write_is_reported_in_outcome() {
        let automation = make_automation(vec![Step::new("call", "Call", StepAction::Call)]);
        let store = MockStore::with(&automation);
        store.fail_updates();
        let scheduler = MockScheduler::default();

        match executor(&store, &scheduler).execute_step(&automation, 0, &make_deal()) {
            StepOutcome::Completed { persisted, .. } => assert!(!persisted),
            other => panic!("expected Completed, got {:?}", other),
        }
        assert_eq!(store.automation(&automation.id).steps[0].status, StepStatus::Pending);
    }

    #[test]
    fn successful_status_write_is_persisted() {
        let automation = make_automation(vec![Step::new("call", "Call", StepAction::Call)]);
        let store = MockStore::with(&automation);
        let scheduler = MockScheduler::default();

        match executor(&store, &scheduler).execute_step(&automation, 0, &make_deal()) {
            StepOutcome::Completed { persisted, .. } => assert!(persisted),
            other => panic!("expected Completed, got {:?}", other),
        }
    }
}
