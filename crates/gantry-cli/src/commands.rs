//! CLI command implementations.

use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use gantry_cache::{CacheManager, LocalDiskStore};
use gantry_config::load_workflow;
use gantry_core::event::{Event, EventKind};
use gantry_core::result::{LogStream, RunStatus};
use gantry_engine::{RunEvent, RunGraph, RunSupervisor, trigger};
use gantry_executor::{LocalProcessRunner, NodeExecutor};

/// Parse and validate a workflow file, including graph construction.
pub fn validate(path: &str) -> anyhow::Result<()> {
    let workflow =
        load_workflow(path).with_context(|| format!("failed to load workflow from {path}"))?;
    let graph = RunGraph::build(&workflow.jobs)?;
    println!(
        "OK: workflow '{}' with {} job(s), {} trigger(s), {} cache(s)",
        workflow.name,
        graph.len(),
        workflow.triggers.len(),
        workflow.caches.len()
    );
    Ok(())
}

/// Execute a workflow for an event. Returns the process exit code.
pub async fn run(
    path: &str,
    kind: EventKind,
    changed_paths: Vec<String>,
    cache_dir: &str,
    verbose_logs: bool,
    json: bool,
) -> anyhow::Result<i32> {
    let workflow =
        load_workflow(path).with_context(|| format!("failed to load workflow from {path}"))?;
    let graph = RunGraph::build(&workflow.jobs)?;

    let event = Event::new(kind, changed_paths);
    if !trigger::evaluate(&event, &workflow) {
        println!("skipped: no trigger matches this event");
        return Ok(0);
    }

    info!(workflow = %workflow.name, event = %event.kind, "Starting run");

    let executor = NodeExecutor::new(
        Arc::new(LocalProcessRunner::new()),
        Arc::new(CacheManager::new(Arc::new(LocalDiskStore::new(cache_dir)))),
    );
    let supervisor = RunSupervisor::new(Arc::new(executor));

    // Ctrl-C cancels the run: in-flight nodes are terminated, completed
    // nodes keep their results.
    let cancel = CancellationToken::new();
    let ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling run...");
            ctrlc.cancel();
        }
    });

    let (mut rx, handle) = supervisor.execute(&workflow, graph, cancel);
    while let Some(event) = rx.recv().await {
        if json {
            continue;
        }
        match event {
            RunEvent::JobStarted { job } => println!("[{job}] started"),
            RunEvent::JobCompleted { job, outcome } => println!("[{job}] {outcome}"),
            RunEvent::RunCompleted { .. } => {}
        }
    }
    let run = handle.await.context("run supervisor task failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(match run.overall_status {
            RunStatus::Pass => 0,
            RunStatus::Fail => 1,
        });
    }

    println!();
    for result in &run.job_results {
        println!(
            "{:<12} {:<16} exit={} ({:.1}s)",
            result.job_name,
            result.outcome.to_string(),
            result.exit_code,
            result.duration.as_secs_f64()
        );
        if verbose_logs || !result.passed() {
            for line in &result.logs {
                let tag = match line.stream {
                    LogStream::Stdout => "out",
                    LogStream::Stderr => "err",
                    LogStream::System => "sys",
                };
                println!("  {} | {}", tag, line.content);
            }
        }
    }
    println!("\noverall: {}", run.overall_status);

    Ok(match run.overall_status {
        RunStatus::Pass => 0,
        RunStatus::Fail => 1,
    })
}
