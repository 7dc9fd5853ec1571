//! Local process runner.

use async_trait::async_trait;
use chrono::Utc;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use gantry_core::result::{LogLine, LogStream};
use gantry_core::runner::{CommandInvocation, CommandOutput, CommandRunner};
use gantry_core::{ExecError, Result};

/// Runs invocations as local child processes.
pub struct LocalProcessRunner;

impl LocalProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for LocalProcessRunner {
    async fn run(
        &self,
        invocation: CommandInvocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput> {
        let start = Instant::now();

        debug!(command = %invocation.display(), "Spawning process");
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(&invocation.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(collect_lines(stdout, LogStream::Stdout));
        let stderr_task = tokio::spawn(collect_lines(stderr, LogStream::Stderr));

        let waited = match invocation.timeout {
            Some(budget) => {
                match tokio::time::timeout(budget, wait_or_cancel(&mut child, cancel)).await {
                    Ok(waited) => waited?,
                    Err(_elapsed) => {
                        let _ = child.kill().await;
                        return Err(ExecError::Timeout {
                            command: invocation.display(),
                            budget_secs: budget.as_secs(),
                        });
                    }
                }
            }
            None => wait_or_cancel(&mut child, cancel).await?,
        };

        let status = match waited {
            Some(status) => status,
            None => {
                let _ = child.kill().await;
                return Err(ExecError::Cancelled);
            }
        };

        let mut logs = stdout_task.await.unwrap_or_default();
        logs.extend(stderr_task.await.unwrap_or_default());
        logs.sort_by_key(|line| line.timestamp);

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            logs,
            duration: start.elapsed(),
        })
    }
}

/// Wait for the child to exit, or for run-level cancellation (`None`).
async fn wait_or_cancel(
    child: &mut Child,
    cancel: &CancellationToken,
) -> Result<Option<std::process::ExitStatus>> {
    tokio::select! {
        status = child.wait() => Ok(Some(status?)),
        _ = cancel.cancelled() => Ok(None),
    }
}

async fn collect_lines(reader: Option<impl AsyncRead + Unpin>, stream: LogStream) -> Vec<LogLine> {
    let mut out = Vec::new();
    let Some(reader) = reader else {
        return out;
    };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(content)) = lines.next_line().await {
        out.push(LogLine {
            timestamp: Utc::now(),
            stream,
            content,
        });
    }
    out
}
