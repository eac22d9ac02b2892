//! Core domain types
//!
//! These types are shared between the runner (which produces them) and the
//! service layer or CLI (which consumes them).

pub mod cluster;
pub mod fact;
pub mod inventory;
pub mod pipeline;
pub mod playbook;
pub mod result;
