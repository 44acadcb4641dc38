//! # dealflow-templates
//!
//! The automation template catalog and its eligibility evaluator.
//!
//! ## Overview
//!
//! Templates are data: they live in a TOML file (`templates/catalog.toml`
//! ships built in) and are never mutated. [`evaluate`] checks one template
//! against one deal and reports whether its condition and trigger are
//! satisfied, plus which step kinds it contains.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dealflow_templates::TemplateCatalog;
//!
//! let catalog = TemplateCatalog::builtin()?;
//! for template in catalog.eligible(&deal) {
//!     println!("{}", template.name);
//! }
//! ```

pub mod catalog;
pub mod evaluate;

pub use catalog::TemplateCatalog;
pub use evaluate::{classify_trigger, condition_holds, evaluate};

// ── Tests ─────────────────────────────────────────────────────────────────────
