//! ledger-import reconciles bank and brokerage CSV exports against a local
//! transaction store and appends only what is new.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
