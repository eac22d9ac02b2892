//! Cairn Core
//!
//! Core types for the Cairn cluster-lifecycle orchestrator.
//!
//! This crate contains:
//! - Domain types: facts, inventory, playbook identifiers, run results
//! - The error taxonomy shared by the runner and its callers
//!
//! Execution logic lives in `cairn-runner`.

pub mod domain;
pub mod error;

pub use error::{Error, Result};
