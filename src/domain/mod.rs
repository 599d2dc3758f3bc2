//! Core domain types and the import pipeline.

pub mod transaction;
pub mod account;
pub mod rule;
pub mod classifier;
pub mod reconciler;
pub mod import;
pub mod config_validation;
pub mod error;
