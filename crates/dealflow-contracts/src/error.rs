//! Error types for the DEALFLOW runtime.
//!
//! Fallible operations return `DealflowResult<T>`. The evaluator never
//! produces these; the executor converts them into `StepOutcome::Failed`.

use thiserror::Error;

/// The unified error type for the DEALFLOW runtime.
#[derive(Debug, Error)]
pub enum DealflowError {
    /// A template or request referenced something the runtime does not know.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// A composed email resolved to an empty subject or body.
    #[error("email {field} is empty after placeholder substitution")]
    EmptyContent { field: String },

    /// Neither the mail composer nor the clipboard accepted the message.
    #[error("no delivery surface available: {reason}")]
    DeliveryUnavailable { reason: String },

    /// The persistence service or another external collaborator failed.
    #[error("external service error: {reason}")]
    ExternalService { reason: String },

    /// A user-requested automation status change is not allowed.
    #[error("cannot move automation '{id}' from {from} to {to}")]
    InvalidTransition { id: String, from: String, to: String },

    /// A record the caller referenced does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// A configuration or catalog file is missing or malformed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// An enrichment response failed schema or rule verification.
    #[error("enrichment verification failed: {reason}")]
    Verification { reason: String },
}

impl DealflowError {
    /// Shorthand used by store implementations.
    pub fn external(reason: impl Into<String>) -> Self {
        Self::ExternalService { reason: reason.into() }
    }

    /// True for failures worth retrying (network, auth hiccups).
    pub fn is_transient(&self) -> bool {
        matches!(self, DealflowError::ExternalService { .. })
    }
}

/// Convenience alias used throughout the DEALFLOW crates.
pub type DealflowResult<T> = Result<T, DealflowError>;
