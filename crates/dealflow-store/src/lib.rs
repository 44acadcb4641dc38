//! # dealflow-store
//!
//! Process-local collaborators for the DEALFLOW executor: an in-memory
//! `CrmStore`, a due-time ordered `Scheduler`, and stand-in mail and
//! clipboard surfaces.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dealflow_store::{InMemoryStore, MemoryClipboard, RecordingComposer, TimerQueue};
//!
//! let store = InMemoryStore::new();
//! let timers = TimerQueue::new();
//! let executor = StepExecutor::new(
//!     Box::new(store.clone()),
//!     Box::new(RecordingComposer::new()),
//!     Box::new(MemoryClipboard::new()),
//!     Box::new(timers.clone()),
//!     ExecutorConfig::default(),
//! );
//! ```

pub mod delivery;
pub mod memory;
pub mod timer;

pub use delivery::{MemoryClipboard, RecordingComposer, UnavailableClipboard, UnavailableComposer};
pub use memory::InMemoryStore;
pub use timer::TimerQueue;

// ── Tests ─────────────────────────────────────────────────────────────────────
