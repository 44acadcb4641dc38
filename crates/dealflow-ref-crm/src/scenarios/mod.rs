//! CRM reference runtime demo scenarios.
//!
//! Each scenario wires real DEALFLOW components (catalog, store, executor,
//! enrichment service) to the mock pipeline and prints what happens.

pub mod deal_enrichment;
pub mod follow_up_sequence;
pub mod pipeline_review;
