//! Node execution: one job's ordered step sequence.
//!
//! Steps run strictly sequentially inside one provisioned environment.
//! The first non-zero exit halts the node (fail-fast); sibling nodes are
//! never affected. Every failure is folded into the returned [`JobResult`],
//! never propagated.

use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gantry_cache::CacheManager;
use gantry_core::ExecError;
use gantry_core::result::{JobOutcome, JobResult, LogLine};
use gantry_core::runner::{CommandInvocation, CommandRunner};
use gantry_core::workflow::{CacheSpec, JobSpec, Step, ToolchainSpec};

/// Executes one node's steps against a command runner and a cache manager.
pub struct NodeExecutor {
    runner: Arc<dyn CommandRunner>,
    cache: Arc<CacheManager>,
}

impl NodeExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, cache: Arc<CacheManager>) -> Self {
        Self { runner, cache }
    }

    /// Run every step of `job` in order. Cache saves are held back and run
    /// only once every other step has succeeded.
    ///
    /// `base_env` is the workflow-level environment, merged under the job's
    /// own variables. `caches` maps cache names to their declarations.
    pub async fn execute(
        &self,
        job: &JobSpec,
        base_env: &HashMap<String, String>,
        caches: &HashMap<String, CacheSpec>,
        cancel: &CancellationToken,
    ) -> JobResult {
        let start = Instant::now();
        let env = merged_env(job, base_env);
        let mut logs: Vec<LogLine> = Vec::new();
        let mut failure: Option<(JobOutcome, i32)> = None;
        let mut pending_saves: Vec<&str> = Vec::new();

        for step in &job.steps {
            if cancel.is_cancelled() {
                logs.push(LogLine::system("run cancelled"));
                failure = Some((JobOutcome::Cancelled, -1));
                break;
            }

            // Saves are deferred to the end of the sequence: a cache entry
            // must never be written by a node whose commands fail, wherever
            // the save step was declared.
            if let Step::SaveCache { cache } = step {
                pending_saves.push(cache.as_str());
                continue;
            }

            logs.push(LogLine::system(format!("step: {}", step.label())));

            match step {
                Step::ProvisionToolchain => {
                    let invocation = provision_invocation(&job.toolchain, &env, job);
                    match self.runner.run(invocation, cancel).await {
                        Ok(output) => {
                            let succeeded = output.success();
                            let code = output.exit_code;
                            logs.extend(output.logs);
                            if !succeeded {
                                let err = ExecError::Provision(format!(
                                    "rustup exited with code {code}"
                                ));
                                logs.push(LogLine::system(err.to_string()));
                                failure = Some((JobOutcome::ProvisionFailed, code));
                                break;
                            }
                        }
                        Err(e) => {
                            logs.push(LogLine::system(e.to_string()));
                            failure = Some(classify(&e, true));
                            break;
                        }
                    }
                }
                Step::RunCommand { command } => {
                    let mut invocation = CommandInvocation::new(
                        "/bin/sh",
                        vec!["-c".to_string(), command.clone()],
                    );
                    invocation.env = env.clone();
                    invocation.timeout = job.environment.step_timeout;
                    match self.runner.run(invocation, cancel).await {
                        Ok(output) => {
                            let succeeded = output.success();
                            let code = output.exit_code;
                            logs.extend(output.logs);
                            if !succeeded {
                                let err = ExecError::Command {
                                    command: command.clone(),
                                    code,
                                };
                                logs.push(LogLine::system(err.to_string()));
                                failure = Some((JobOutcome::CommandFailed, code));
                                break;
                            }
                        }
                        Err(e) => {
                            logs.push(LogLine::system(e.to_string()));
                            failure = Some(classify(&e, false));
                            break;
                        }
                    }
                }
                Step::RestoreCache { cache } => {
                    self.restore_cache(job, cache, caches, &mut logs).await;
                }
                Step::SaveCache { .. } => {}
            }
        }

        if failure.is_none() {
            for cache in pending_saves {
                logs.push(LogLine::system(format!("step: save-cache {cache}")));
                self.save_cache(job, cache, caches, &mut logs).await;
            }
        }

        let (outcome, exit_code) = failure.unwrap_or((JobOutcome::Succeeded, 0));
        info!(job = %job.name, %outcome, exit_code, "Node finished");

        JobResult {
            job_name: job.name.clone(),
            outcome,
            exit_code,
            duration: start.elapsed(),
            logs,
        }
    }

    /// Best-effort restore: a miss, an unreadable lockfile or a backend
    /// error all leave the node proceeding as if no cache existed.
    async fn restore_cache(
        &self,
        job: &JobSpec,
        cache: &str,
        caches: &HashMap<String, CacheSpec>,
        logs: &mut Vec<LogLine>,
    ) {
        let Some(spec) = caches.get(cache) else {
            warn!(job = %job.name, cache, "Unknown cache in restore step");
            return;
        };
        let Some(key) = self.cache.derive_key(&job.toolchain, spec).await else {
            logs.push(LogLine::system(format!("cache '{cache}': no key, skipping")));
            return;
        };
        match self.cache.restore(&key).await {
            Some(data) => {
                if let Err(e) = write_artifact(&spec.path, &data).await {
                    warn!(job = %job.name, cache, error = %e, "Failed to place restored artifact");
                    logs.push(LogLine::system(format!("cache '{cache}': restore failed")));
                } else {
                    logs.push(LogLine::system(format!(
                        "cache '{cache}': restored {} bytes",
                        data.len()
                    )));
                }
            }
            None => {
                logs.push(LogLine::system(format!("cache '{cache}': miss")));
            }
        }
    }

    async fn save_cache(
        &self,
        job: &JobSpec,
        cache: &str,
        caches: &HashMap<String, CacheSpec>,
        logs: &mut Vec<LogLine>,
    ) {
        let Some(spec) = caches.get(cache) else {
            warn!(job = %job.name, cache, "Unknown cache in save step");
            return;
        };
        let Some(key) = self.cache.derive_key(&job.toolchain, spec).await else {
            logs.push(LogLine::system(format!("cache '{cache}': no key, skipping")));
            return;
        };
        match tokio::fs::read(&spec.path).await {
            Ok(data) => {
                let len = data.len();
                self.cache.save(&key, Bytes::from(data)).await;
                logs.push(LogLine::system(format!(
                    "cache '{cache}': saved {len} bytes"
                )));
            }
            Err(e) => {
                warn!(job = %job.name, cache, path = %spec.path, error = %e,
                    "Cache artifact unreadable, skipping save");
                logs.push(LogLine::system(format!("cache '{cache}': nothing to save")));
            }
        }
    }
}

/// Workflow env under job env, plus the test concurrency hint.
fn merged_env(job: &JobSpec, base_env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env = base_env.clone();
    env.extend(job.environment.env.clone());
    if let Some(threads) = job.environment.test_concurrency {
        env.insert("RUST_TEST_THREADS".to_string(), threads.to_string());
    }
    env
}

/// Provisioning is itself an opaque command with a zero-exit contract.
fn provision_invocation(
    toolchain: &ToolchainSpec,
    env: &HashMap<String, String>,
    job: &JobSpec,
) -> CommandInvocation {
    let mut args = vec![
        "toolchain".to_string(),
        "install".to_string(),
        toolchain.name.clone(),
        "--profile".to_string(),
        toolchain.profile.clone(),
    ];
    for component in &toolchain.components {
        args.push("--component".to_string());
        args.push(component.clone());
    }
    let mut invocation = CommandInvocation::new("rustup", args);
    invocation.env = env.clone();
    invocation.timeout = job.environment.step_timeout;
    invocation
}

fn classify(err: &ExecError, provisioning: bool) -> (JobOutcome, i32) {
    match err {
        ExecError::Timeout { .. } => (JobOutcome::TimedOut, -1),
        ExecError::Cancelled => (JobOutcome::Cancelled, -1),
        _ if provisioning => (JobOutcome::ProvisionFailed, -1),
        _ => (JobOutcome::CommandFailed, -1),
    }
}

async fn write_artifact(path: &str, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, data).await
}
