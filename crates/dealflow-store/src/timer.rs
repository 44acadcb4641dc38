//! An in-process `Scheduler` that holds continuations until they are due.
//!
//! Nothing here survives a restart. With durable scheduling enabled the
//! executor can rebuild the queue through `StepExecutor::recover`.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use dealflow_contracts::{
    error::{DealflowError, DealflowResult},
    execution::Continuation,
};
use dealflow_core::traits::Scheduler;

/// Continuations ordered by due time; ties keep scheduling order.
#[derive(Clone, Default)]
pub struct TimerQueue {
    pending: Arc<Mutex<Vec<Continuation>>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every continuation due at or before `now`,
    /// earliest first.
    pub fn pop_due(&self, now: DateTime<Utc>) -> Vec<Continuation> {
        let Ok(mut pending) = self.pending.lock() else {
            return Vec::new();
        };
        let split = pending.partition_point(|c| c.due_at <= now);
        pending.drain(..split).collect()
    }

    /// Remove and return everything, due or not. Used to fast-forward demos.
    pub fn drain_all(&self) -> Vec<Continuation> {
        self.pending.lock().map(|mut p| p.drain(..).collect::<Vec<_>>()).unwrap_or_default()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.pending.lock().ok()?.first().map(|c| c.due_at)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&self, continuation: Continuation) -> DealflowResult<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|e| DealflowError::external(format!("timer queue lock poisoned: {}", e)))?;

        let index = pending.partition_point(|c| c.due_at <= continuation.due_at);
        debug!(
            automation_id = %continuation.automation_id,
            step_index = continuation.step_index,
            due_at = %continuation.due_at,
            queued = pending.len() + 1,
            "continuation queued"
        );
        pending.insert(index, continuation);
        Ok(())
    }
}
