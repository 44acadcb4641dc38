//! Executor configuration, loadable from TOML.
//!
//! ```toml
//! durable_scheduling = false
//! day_length_secs = 86400
//! ```

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use dealflow_contracts::error::{DealflowError, DealflowResult};

const SECONDS_PER_DAY: u64 = 86_400;

// chrono::Duration panics beyond i64::MAX milliseconds.
const MAX_DELAY_SECS: i64 = i64::MAX / 1_000 - 1;

/// Knobs for `StepExecutor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// When false (the default), delay continuations live only in the
    /// scheduler and are lost if the process exits before they fire. When
    /// true, the executor also writes `nextRun` on the automation and
    /// `scheduledAt` on the next step so `StepExecutor::recover` can rebuild
    /// them.
    pub durable_scheduling: bool,

    /// Length of one delay "day" in seconds. Shortened in demos.
    pub day_length_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { durable_scheduling: false, day_length_secs: SECONDS_PER_DAY }
    }
}

impl ExecutorConfig {
    /// Parse `s` as TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> DealflowResult<Self> {
        toml::from_str(s).map_err(|e| DealflowError::ConfigError {
            reason: format!("failed to parse executor config TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> DealflowResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DealflowError::ConfigError {
            reason: format!("failed to read executor config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The wall-clock duration of a delay of `days` days.
    pub fn delay_for(&self, days: u32) -> Duration {
        let secs = self.day_length_secs.saturating_mul(u64::from(days));
        let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(MAX_DELAY_SECS);
        Duration::seconds(secs)
    }
}
