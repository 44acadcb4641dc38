//! Step execution results and deferred continuations.
//!
//! `StepOutcome` is what the executor returns for every step it is asked to
//! run. Failures are reported here rather than as `Err`, because a failing
//! step must never abort the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deal::Deal;

/// How a composed email left the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "kebab-case")]
pub enum Delivery {
    /// Handed to the mail-compose surface.
    Composer,
    /// Placed on the clipboard as `"Subject: …\n\n…"`.
    Clipboard,
    /// Neither surface was available; the caller must show `content` for
    /// manual copy.
    Manual { content: String },
}

/// The result of asking the executor to run one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step's side effect succeeded and the step is now `completed`.
    Completed {
        step_id: String,
        /// Set for email steps only.
        delivery: Option<Delivery>,
        /// False when the side effect happened but writing the `completed`
        /// status to the store failed; the stored copy still shows the step
        /// as `active`.
        persisted: bool,
    },

    /// The step raised an error and is now `failed`. Nothing was retried.
    Failed { step_id: String, reason: String },

    /// A delay step scheduled its successor. The delay step itself keeps
    /// its status.
    Deferred { step_id: String, continuation: Continuation },

    /// `step_index` is past the end of the automation.
    NotFound { step_index: usize },
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

/// A step scheduled to run later by a delay step.
///
/// Carries the deal snapshot the delay step saw; deals are read-only to the
/// runtime, so the continuation does not re-read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    pub automation_id: String,
    pub step_index: usize,
    pub due_at: DateTime<Utc>,
    pub deal: Deal,
}
