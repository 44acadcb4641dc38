//! # dealflow-contracts
//!
//! Shared types, records, and error contracts for the DEALFLOW deal
//! automation runtime.
//!
//! Every crate in the workspace imports from here. No business logic lives
//! in this crate beyond small helpers on the data types themselves.

pub mod automation;
pub mod deal;
pub mod error;
pub mod evaluation;
pub mod execution;
pub mod records;
pub mod step;
pub mod template;
