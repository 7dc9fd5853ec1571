//! Core domain types and traits for the Gantry CI engine.
//!
//! This crate contains:
//! - Run identifiers and common types
//! - Events and path filters (what starts a run)
//! - Workflow, job, step and toolchain definitions
//! - Job and run results
//! - The command runner trait the executor implements

pub mod error;
pub mod event;
pub mod id;
pub mod result;
pub mod runner;
pub mod workflow;

pub use error::{ExecError, Result};
pub use id::RunId;
