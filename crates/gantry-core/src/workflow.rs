//! Workflow, job, step and toolchain definitions.
//!
//! These are declared once at configuration load and are immutable for the
//! lifetime of a run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::event::{EventKind, PathFilter};

/// A complete workflow definition: what starts it and what it runs.
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    /// Workflow name (e.g., "rust-ci").
    pub name: String,
    /// Triggers that can start this workflow.
    pub triggers: Vec<TriggerRule>,
    /// Jobs, in declaration order. Jobs are independent of each other.
    pub jobs: Vec<JobSpec>,
    /// Cache definitions jobs may reference by name.
    pub caches: Vec<CacheSpec>,
    /// Workflow-level environment variables, merged under each job's own.
    pub env: HashMap<String, String>,
}

impl WorkflowSpec {
    /// Look up a cache definition by name.
    pub fn cache(&self, name: &str) -> Option<&CacheSpec> {
        self.caches.iter().find(|c| c.name == name)
    }
}

/// One trigger: an event kind plus the ignore globs applied to its change set.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    pub on: EventKind,
    pub paths_ignore: PathFilter,
}

/// A single job: an ordered step sequence run in one provisioned environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    /// Job name (e.g., "lint").
    pub name: String,
    /// Toolchain provisioned for this job.
    pub toolchain: ToolchainSpec,
    /// Steps, executed strictly in order.
    pub steps: Vec<Step>,
    /// Execution environment configuration.
    pub environment: ExecutionEnvironment,
}

/// A single atomic action within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Install the job's toolchain before any command runs.
    ProvisionToolchain,
    /// Restore a named cache. A miss is not an error.
    RestoreCache { cache: String },
    /// Invoke an external tool; zero exit code means success.
    RunCommand { command: String },
    /// Save a named cache. Only reached when every prior step succeeded.
    SaveCache { cache: String },
}

impl Step {
    /// Short label used in logs and reports.
    pub fn label(&self) -> String {
        match self {
            Step::ProvisionToolchain => "provision".to_string(),
            Step::RestoreCache { cache } => format!("restore-cache {cache}"),
            Step::RunCommand { command } => command.clone(),
            Step::SaveCache { cache } => format!("save-cache {cache}"),
        }
    }
}

/// Toolchain to provision for a job's execution environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainSpec {
    /// Channel or version (e.g., "stable", "1.85").
    pub name: String,
    /// Installation profile (e.g., "minimal").
    pub profile: String,
    /// Extra components (e.g., "rustfmt", "clippy").
    pub components: Vec<String>,
}

impl ToolchainSpec {
    /// Stable fingerprint of this toolchain, used in cache key derivation.
    /// Component order does not affect the fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut components = self.components.clone();
        components.sort();
        format!("{}/{}/{}", self.name, self.profile, components.join("+"))
    }
}

/// Configuration of the environment a job's steps run in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionEnvironment {
    /// Environment variables for every step in the job.
    pub env: HashMap<String, String>,
    /// If set, serialize test execution within this job to the given number
    /// of threads (exported as RUST_TEST_THREADS by the local runner).
    pub test_concurrency: Option<u32>,
    /// Wall-clock budget per step. None means no budget.
    pub step_timeout: Option<Duration>,
}

/// A named cache: which artifact it covers and which lockfile keys it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSpec {
    /// Cache name jobs reference in restore/save steps.
    pub name: String,
    /// Path of the cached artifact on disk.
    pub path: String,
    /// Dependency lockfile whose contents key the cache.
    pub lockfile: String,
}
