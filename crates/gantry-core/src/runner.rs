//! Command runner trait.
//!
//! Runners invoke external collaborator tools (formatter, static analyzer,
//! test runner) as opaque processes. The engine interprets nothing beyond
//! exit status and raw log output.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::result::LogLine;

/// One process invocation: program, arguments and environment.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Wall-clock budget for this invocation. None means no budget.
    pub timeout: Option<Duration>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: HashMap::new(),
            timeout: None,
        }
    }

    /// Human-readable form for logs and error messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Output of a completed invocation. A non-zero exit code is still `Ok`:
/// the tool ran and reported failure, which is the caller's to classify.
#[derive(Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub logs: Vec<LogLine>,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for process runners.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one invocation to completion.
    ///
    /// Returns `Err` only when the process could not run to a normal exit:
    /// spawn failure, budget exceeded, or cancellation. In the latter two
    /// cases the child process must already be terminated on return.
    async fn run(
        &self,
        invocation: CommandInvocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput>;
}
