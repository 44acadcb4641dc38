//! # dealflow-core
//!
//! The deal automation runtime.
//!
//! This crate provides:
//! - The collaborator traits (`CrmStore`, `MailComposer`, `Clipboard`,
//!   `Scheduler`)
//! - The materializer that turns a template into a draft automation
//! - The `StepExecutor` that runs automation steps one at a time
//! - User-driven status transitions and executor configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dealflow_core::{materializer::materialize_into, StepExecutor};
//!
//! let automation = materialize_into(&store, &template, &deal.id)?;
//! let outcome = executor.execute_step(&automation, 0, &deal);
//! ```

pub mod config;
pub mod executor;
pub mod lifecycle;
pub mod materializer;
pub mod placeholders;
pub mod traits;

pub use config::ExecutorConfig;
pub use executor::StepExecutor;
pub use placeholders::TriggerContext;
