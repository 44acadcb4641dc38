//! # dealflow-ref-crm
//!
//! CRM reference runtime for the DEALFLOW deal automation system.
//!
//! Demonstrates three scenarios using mock data:
//!
//! 1. **Pipeline Review** — every catalog template evaluated against a
//!    sample pipeline, showing which ones the "Use Template" button enables.
//! 2. **Follow-up Sequence** — a template materialized, activated, and run
//!    through email, attachment, delay, and task steps, with the change feed
//!    and the pause/resume lifecycle.
//! 3. **Deal Enrichment** — cached, retried, schema-verified insights from
//!    a scripted model.
//!
//! All data is hardcoded and fictional. No external API calls are made.

pub mod mock_data;
pub mod scenarios;
