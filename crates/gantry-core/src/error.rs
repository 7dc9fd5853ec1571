//! Error types for node-scoped execution failures.
//!
//! These never cross node boundaries: the executor folds them into the
//! node's [`JobResult`](crate::result::JobResult) instead of propagating.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("toolchain provisioning failed: {0}")]
    Provision(String),

    #[error("command exited with code {code}: {command}")]
    Command { command: String, code: i32 },

    #[error("step exceeded {budget_secs}s budget: {command}")]
    Timeout { command: String, budget_secs: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExecError>;
