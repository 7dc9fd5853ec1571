//! Job and run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// Every step completed with exit code 0.
    Succeeded,
    /// An invoked tool exited non-zero.
    CommandFailed,
    /// Toolchain provisioning failed.
    ProvisionFailed,
    /// A step exceeded its wall-clock budget.
    TimedOut,
    /// The run was cancelled while this job was in flight.
    Cancelled,
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Succeeded => write!(f, "succeeded"),
            JobOutcome::CommandFailed => write!(f, "command failed"),
            JobOutcome::ProvisionFailed => write!(f, "provision failed"),
            JobOutcome::TimedOut => write!(f, "timed out"),
            JobOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one completed job. Immutable once finalized; owned by the
/// executor until handed to the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Job name.
    pub job_name: String,
    /// Classification of how the job ended.
    pub outcome: JobOutcome,
    /// Exit code of the failing step, or 0 on success. Non-command failures
    /// (timeout, cancellation, spawn errors) report -1.
    pub exit_code: i32,
    /// Wall-clock duration of the job.
    pub duration: Duration,
    /// Captured log lines from every executed step.
    pub logs: Vec<LogLine>,
}

impl JobResult {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pass => write!(f, "pass"),
            RunStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Terminal state of a run: one overall status plus per-job detail.
///
/// `job_results` order mirrors graph node order, not completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub overall_status: RunStatus,
    pub job_results: Vec<JobResult>,
}

/// A line of log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub stream: LogStream,
    pub content: String,
}

impl LogLine {
    pub fn stdout(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream: LogStream::Stdout,
            content: content.into(),
        }
    }

    pub fn stderr(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream: LogStream::Stderr,
            content: content.into(),
        }
    }

    /// Engine-generated line (step boundaries, cache activity, failures).
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream: LogStream::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStream {
    Stdout,
    Stderr,
    System,
}
