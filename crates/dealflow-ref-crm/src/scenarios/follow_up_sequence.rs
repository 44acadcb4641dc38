//! Scenario 2: Follow-up Sequence
//!
//! Walks one automation through its whole life:
//!
//!   materialize → activate → run until the delay → fire the timer → resume
//!
//! A change-feed subscription prints every write the executor makes. The
//! second half pauses a second automation while its delay is pending and
//! shows the continuation being dropped, then logs a stage change through a
//! communication step with a trigger context.

use std::sync::{Arc, Mutex};

use dealflow_contracts::{
    automation::AutomationChange,
    error::{DealflowError, DealflowResult},
    execution::{Delivery, StepOutcome},
    template::Template,
};
use dealflow_core::{
    lifecycle,
    materializer::materialize_into,
    traits::CrmStore,
    ExecutorConfig, StepExecutor, TriggerContext,
};
use dealflow_store::{InMemoryStore, RecordingComposer, TimerQueue, UnavailableClipboard};
use dealflow_templates::TemplateCatalog;

use crate::mock_data::find_deal;

const FOLLOW_UP: &str = "proposal-follow-up";
const STAGE_LOG: &str = "stage-change-log";

fn template<'a>(catalog: &'a TemplateCatalog, id: &str) -> DealflowResult<&'a Template> {
    catalog
        .get(id)
        .ok_or_else(|| DealflowError::NotFound { kind: "template".to_string(), id: id.to_string() })
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Completed { step_id, delivery: Some(Delivery::Manual { .. }), .. } => {
            format!("{step_id}: completed (left for manual copy)")
        }
        StepOutcome::Completed { step_id, delivery: Some(d), .. } => format!("{step_id}: completed via {:?}", d),
        StepOutcome::Completed { step_id, delivery: None, .. } => format!("{step_id}: completed"),
        StepOutcome::Failed { step_id, reason } => format!("{step_id}: FAILED ({reason})"),
        StepOutcome::Deferred { step_id, continuation } => format!(
            "{step_id}: deferred, step {} due {}",
            continuation.step_index,
            continuation.due_at.format("%Y-%m-%d %H:%M:%S")
        ),
        StepOutcome::NotFound { step_index } => format!("step {step_index}: not found"),
    }
}

pub fn run_scenario(catalog: &TemplateCatalog, config: &ExecutorConfig) -> DealflowResult<()> {
    println!("=== Scenario 2: Follow-up Sequence ===");
    println!();

    // ── Wire up the DEALFLOW components ───────────────────────────────────────

    let store = InMemoryStore::new();
    let timers = TimerQueue::new();
    let composer = RecordingComposer::new();
    let deal = find_deal("deal-hooli")?;
    store.insert_deal(deal.clone())?;

    let executor = StepExecutor::new(
        Box::new(store.clone()),
        Box::new(composer.clone()),
        Box::new(UnavailableClipboard),
        Box::new(timers.clone()),
        config.clone(),
    );

    let feed: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&feed);
    let subscription = store.subscribe_to_automations(
        &deal.id,
        Box::new(move |change: &AutomationChange| {
            let line = match change {
                AutomationChange::Insert { automation } => format!("insert {}", automation.name),
                AutomationChange::Update { automation } => format!(
                    "update {} [{}]",
                    automation.status.as_str(),
                    automation
                        .steps
                        .iter()
                        .map(|s| format!("{:?}", s.status).to_lowercase())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                AutomationChange::Delete { id, .. } => format!("delete {id}"),
            };
            if let Ok(mut feed) = sink.lock() {
                feed.push(line);
            }
        }),
    )?;

    // ── Materialize, activate, run ────────────────────────────────────────────

    let follow_up = template(catalog, FOLLOW_UP)?;
    let automation = materialize_into(&store, follow_up, &deal.id)?;
    let automation = lifecycle::activate(&store, &automation)?;
    println!("  Automation '{}' for {} ({} steps)", automation.name, deal.title, automation.steps.len());

    for outcome in executor.run_sequence(&automation, 0, &deal) {
        println!("    {}", describe(&outcome));
    }
    if let Some(email) = composer.sent().first() {
        println!("    composed: \"{}\" to {}", email.subject, email.to);
    }

    // The demo does not wait out real days; every queued timer fires now.
    println!();
    println!("  Firing {} pending timer(s)", timers.len());
    for continuation in timers.drain_all() {
        match executor.resume(&continuation)? {
            Some(outcome) => println!("    {}", describe(&outcome)),
            None => println!("    continuation for {} dropped", continuation.automation_id),
        }
    }

    let tasks = store.tasks(&deal.id)?;
    let communications = store.communications(&deal.id)?;
    println!();
    println!("  Tasks created:          {}", tasks.len());
    for task in &tasks {
        println!("    - {} ({:?})", task.title, task.priority);
    }
    println!("  Communications logged:  {}", communications.len());

    let done = lifecycle::complete(&store, &store.automation(&automation.id)?)?;
    println!("  Automation status:      {}", done.status.as_str());

    // ── Pause while a delay is pending ────────────────────────────────────────

    println!();
    let second = lifecycle::activate(&store, &materialize_into(&store, follow_up, &deal.id)?)?;
    executor.run_sequence(&second, 0, &deal);
    lifecycle::pause(&store, &store.automation(&second.id)?)?;
    println!("  Second automation paused with {} timer(s) pending", timers.len());
    for continuation in timers.drain_all() {
        let outcome = executor.resume(&continuation)?;
        println!("    resume -> {}", if outcome.is_some() { "ran" } else { "dropped (paused)" });
    }

    if config.durable_scheduling {
        let recovered = executor.recover(&deal)?;
        println!("  Durable scheduling: {} continuation(s) recoverable", recovered.len());
    }

    // ── Communication step with trigger context ───────────────────────────────

    let stage_log = materialize_into(&store, template(catalog, STAGE_LOG)?, &deal.id)?;
    let ctx = TriggerContext {
        old_stage: Some("qualification".to_string()),
        new_stage: Some(deal.stage.as_str().to_string()),
        ..TriggerContext::default()
    };
    let outcome = executor.execute_step_with(&stage_log, 0, &deal, &ctx);
    println!();
    println!("  Stage change: {}", describe(&outcome));
    if let Some(last) = store.communications(&deal.id)?.last() {
        println!("    \"{}\"", last.content);
    }

    subscription.unsubscribe();

    println!();
    println!("  Change feed ({} events):", feed.lock().map(|f| f.len()).unwrap_or_default());
    if let Ok(feed) = feed.lock() {
        for line in feed.iter().take(6) {
            println!("    {line}");
        }
    }

    if tasks.is_empty() || !outcome.is_completed() {
        return Err(DealflowError::Validation {
            reason: "follow-up sequence did not reach its task step".to_string(),
        });
    }

    println!();
    println!("  Result: PASS — steps ran in order across the delay");
    println!();
    Ok(())
}
