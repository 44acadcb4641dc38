//! Process-local delivery surfaces.
//!
//! Real mail handlers and clipboards belong to the host UI. These stand in
//! for them in demos and tests: one of each that records what it received,
//! and one of each that is always unavailable.

use std::sync::{Arc, Mutex};

use tracing::debug;

use dealflow_contracts::error::{DealflowError, DealflowResult};
use dealflow_core::traits::{Clipboard, ComposedEmail, MailComposer};

/// A mail composer that keeps every email it is handed.
#[derive(Clone, Default)]
pub struct RecordingComposer {
    sent: Arc<Mutex<Vec<ComposedEmail>>>,
}

impl RecordingComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ComposedEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl MailComposer for RecordingComposer {
    fn compose(&self, email: &ComposedEmail) -> DealflowResult<()> {
        debug!(to = %email.to, subject = %email.subject, "email composed");
        self.sent
            .lock()
            .map_err(|e| DealflowError::external(format!("composer lock poisoned: {}", e)))?
            .push(email.clone());
        Ok(())
    }
}

/// A composer that always refuses, like a blocked popup.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableComposer;

impl MailComposer for UnavailableComposer {
    fn compose(&self, _email: &ComposedEmail) -> DealflowResult<()> {
        Err(DealflowError::external("mail composer unavailable"))
    }
}

/// A clipboard holding the last text written to it.
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    text: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.text.lock().ok()?.clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> DealflowResult<()> {
        *self
            .text
            .lock()
            .map_err(|e| DealflowError::external(format!("clipboard lock poisoned: {}", e)))? =
            Some(text.to_string());
        Ok(())
    }
}

/// A clipboard without write permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableClipboard;

impl Clipboard for UnavailableClipboard {
    fn write_text(&self, _text: &str) -> DealflowResult<()> {
        Err(DealflowError::external("clipboard permission denied"))
    }
}
