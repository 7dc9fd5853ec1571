//! Step execution for the Gantry CI engine.
//!
//! Provides the local process runner (external tools as child processes)
//! and the node executor that walks one job's step sequence: provision,
//! cache restore, commands, cache save, fail-fast on the first non-zero
//! exit.

pub mod node;
pub mod process;

pub use node::NodeExecutor;
pub use process::LocalProcessRunner;

pub use gantry_core::runner::{CommandInvocation, CommandOutput, CommandRunner};
