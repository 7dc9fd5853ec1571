//! Run supervision: parallel node execution with error isolation.
//!
//! Each node is its own task; the supervisor collects results without one
//! node's failure cancelling the others. Run-level cancellation propagates
//! to every in-flight node through a shared token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use gantry_core::RunId;
use gantry_core::result::{JobOutcome, JobResult, LogLine, RunResult, RunStatus};
use gantry_core::workflow::{CacheSpec, WorkflowSpec};
use gantry_executor::NodeExecutor;

use crate::aggregate::aggregate;
use crate::graph::RunGraph;

/// Event emitted during run execution.
#[derive(Debug, Clone)]
pub enum RunEvent {
    JobStarted { job: String },
    JobCompleted { job: String, outcome: JobOutcome },
    RunCompleted { status: RunStatus },
}

/// Supervises one run: spawns nodes, collects their results in graph order.
pub struct RunSupervisor {
    executor: Arc<NodeExecutor>,
}

impl RunSupervisor {
    pub fn new(executor: Arc<NodeExecutor>) -> Self {
        Self { executor }
    }

    /// Execute a graph, returning a channel of events and a handle to the
    /// final result.
    ///
    /// Cancelling `cancel` terminates every in-flight node and its child
    /// processes; nodes that already completed keep their results (and any
    /// cache artifacts they saved).
    pub fn execute(
        &self,
        workflow: &WorkflowSpec,
        graph: RunGraph,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<RunEvent>, JoinHandle<RunResult>) {
        let (tx, rx) = mpsc::channel(100);
        let executor = self.executor.clone();
        let base_env = Arc::new(workflow.env.clone());
        let caches: Arc<HashMap<String, CacheSpec>> = Arc::new(
            workflow
                .caches
                .iter()
                .map(|c| (c.name.clone(), c.clone()))
                .collect(),
        );

        let handle = tokio::spawn(async move {
            Self::execute_inner(executor, graph, base_env, caches, cancel, tx).await
        });

        (rx, handle)
    }

    async fn execute_inner(
        executor: Arc<NodeExecutor>,
        graph: RunGraph,
        base_env: Arc<HashMap<String, String>>,
        caches: Arc<HashMap<String, CacheSpec>>,
        cancel: CancellationToken,
        tx: mpsc::Sender<RunEvent>,
    ) -> RunResult {
        let run_id = RunId::new();
        info!(%run_id, nodes = graph.len(), "Run started");

        // Spawn every node up front; they run in parallel and are isolated
        // from each other's failures.
        let mut handles: Vec<(String, JoinHandle<JobResult>)> = Vec::new();
        for node in graph.into_nodes() {
            let executor = executor.clone();
            let base_env = base_env.clone();
            let caches = caches.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            let name = node.spec.name.clone();

            let handle = tokio::spawn(async move {
                let _ = tx
                    .send(RunEvent::JobStarted {
                        job: node.spec.name.clone(),
                    })
                    .await;
                info!(job = %node.spec.name, "Node started");
                let result = executor
                    .execute(&node.spec, &base_env, &caches, &cancel)
                    .await;
                let _ = tx
                    .send(RunEvent::JobCompleted {
                        job: result.job_name.clone(),
                        outcome: result.outcome,
                    })
                    .await;
                result
            });
            handles.push((name, handle));
        }

        // Await in graph order so the report is deterministic regardless of
        // which node finished first.
        let mut results = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(job = %name, error = %e, "Node task did not complete");
                    results.push(JobResult {
                        job_name: name,
                        outcome: JobOutcome::Cancelled,
                        exit_code: -1,
                        duration: Duration::ZERO,
                        logs: vec![LogLine::system(format!("node task failed: {e}"))],
                    });
                }
            }
        }

        let run = aggregate(results);
        info!(%run_id, status = %run.overall_status, "Run completed");
        let _ = tx
            .send(RunEvent::RunCompleted {
                status: run.overall_status,
            })
            .await;
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_cache::{CacheManager, LocalDiskStore};
    use gantry_core::workflow::{ExecutionEnvironment, JobSpec, Step, ToolchainSpec};
    use gantry_executor::LocalProcessRunner;

    fn job(name: &str, commands: &[&str]) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            toolchain: ToolchainSpec {
                name: "stable".to_string(),
                profile: "minimal".to_string(),
                components: vec![],
            },
            steps: commands
                .iter()
                .map(|c| Step::RunCommand {
                    command: c.to_string(),
                })
                .collect(),
            environment: ExecutionEnvironment::default(),
        }
    }

    fn workflow(jobs: Vec<JobSpec>) -> WorkflowSpec {
        WorkflowSpec {
            name: "test".to_string(),
            triggers: vec![],
            jobs,
            caches: vec![],
            env: HashMap::new(),
        }
    }

    fn supervisor(dir: &std::path::Path) -> RunSupervisor {
        RunSupervisor::new(Arc::new(NodeExecutor::new(
            Arc::new(LocalProcessRunner::new()),
            Arc::new(CacheManager::new(Arc::new(LocalDiskStore::new(dir)))),
        )))
    }

    #[tokio::test]
    async fn test_failing_node_does_not_halt_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow(vec![
            job("lint", &["echo first", "exit 2", "echo unreachable"]),
            job("test", &["echo a", "echo b"]),
        ]);
        let graph = RunGraph::build(&workflow.jobs).unwrap();

        let (mut rx, handle) =
            supervisor(dir.path()).execute(&workflow, graph, CancellationToken::new());
        // Drain events so senders never block
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let run = handle.await.unwrap();
        drain.await.unwrap();

        assert_eq!(run.overall_status, RunStatus::Fail);
        assert_eq!(run.job_results.len(), 2);
        assert_eq!(run.job_results[0].job_name, "lint");
        assert_eq!(run.job_results[0].exit_code, 2);
        assert_eq!(run.job_results[1].job_name, "test");
        assert_eq!(run.job_results[1].exit_code, 0);
        assert_eq!(run.job_results[1].outcome, JobOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_report_order_is_graph_order() {
        let dir = tempfile::tempdir().unwrap();
        // First node finishes last; report order must still match input
        let workflow = workflow(vec![
            job("slow", &["sleep 0.3"]),
            job("fast", &["true"]),
        ]);
        let graph = RunGraph::build(&workflow.jobs).unwrap();

        let (mut rx, handle) =
            supervisor(dir.path()).execute(&workflow, graph, CancellationToken::new());
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let run = handle.await.unwrap();
        drain.await.unwrap();

        let names: Vec<_> = run
            .job_results
            .iter()
            .map(|r| r.job_name.as_str())
            .collect();
        assert_eq!(names, vec!["slow", "fast"]);
        assert_eq!(run.overall_status, RunStatus::Pass);
    }

    #[tokio::test]
    async fn test_cancellation_reaches_in_flight_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow(vec![job("hang", &["sleep 30"]), job("quick", &["true"])]);
        let graph = RunGraph::build(&workflow.jobs).unwrap();
        let cancel = CancellationToken::new();

        let (mut rx, handle) = supervisor(dir.path()).execute(&workflow, graph, cancel.clone());
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        let run = handle.await.unwrap();
        drain.await.unwrap();

        assert_eq!(run.job_results[0].outcome, JobOutcome::Cancelled);
        // The quick sibling finished before cancellation and keeps its result
        assert_eq!(run.job_results[1].outcome, JobOutcome::Succeeded);
        assert_eq!(run.overall_status, RunStatus::Fail);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow(vec![job("lint", &["true"])]);
        let graph = RunGraph::build(&workflow.jobs).unwrap();

        let (mut rx, handle) =
            supervisor(dir.path()).execute(&workflow, graph, CancellationToken::new());

        let mut started = false;
        let mut completed = false;
        let mut run_done = false;
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::JobStarted { job } => started = job == "lint",
                RunEvent::JobCompleted { job, outcome } => {
                    completed = job == "lint" && outcome == JobOutcome::Succeeded
                }
                RunEvent::RunCompleted { status } => run_done = status == RunStatus::Pass,
            }
        }
        handle.await.unwrap();
        assert!(started && completed && run_done);
    }
}
