//! Job graph construction.
//!
//! The observed workload has no inter-job dependencies, so the graph is a
//! set of independent nodes; each node's steps are a strictly ordered
//! sub-sequence. Node order is preserved from input order. That matters for
//! report presentation, not correctness.

use gantry_config::{ConfigError, ConfigResult};
use gantry_core::workflow::{JobSpec, Step};

/// One independently schedulable node: a job's ordered step sequence.
#[derive(Debug, Clone)]
pub struct JobNode {
    pub spec: JobSpec,
}

/// The expanded graph for one run.
#[derive(Debug, Clone)]
pub struct RunGraph {
    nodes: Vec<JobNode>,
}

impl RunGraph {
    /// Expand a job set into a graph, one node per job, input order kept.
    ///
    /// Rejects jobs with no steps, jobs where a command would run before
    /// the toolchain provisioning step, and jobs where a cache save is
    /// declared before a step that can still fail (the executor contract
    /// requires provision-before-command and save-after-commands within a
    /// node). Deterministic: identical inputs always produce an identical
    /// graph.
    pub fn build(jobs: &[JobSpec]) -> ConfigResult<Self> {
        let mut nodes = Vec::with_capacity(jobs.len());
        for job in jobs {
            if job.steps.is_empty() {
                return Err(ConfigError::EmptySteps(job.name.clone()));
            }
            validate_step_order(job)?;
            nodes.push(JobNode { spec: job.clone() });
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[JobNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<JobNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn validate_step_order(job: &JobSpec) -> ConfigResult<()> {
    let provision_at = job
        .steps
        .iter()
        .position(|s| matches!(s, Step::ProvisionToolchain));
    let first_command = job
        .steps
        .iter()
        .position(|s| matches!(s, Step::RunCommand { .. }));

    if let (Some(provision), Some(command)) = (provision_at, first_command) {
        if command < provision {
            return Err(ConfigError::StepOrder {
                job: job.name.clone(),
                message: "a command runs before toolchain provisioning".to_string(),
            });
        }
    }

    // A save placed before the last fallible step would persist state from
    // a run that can still fail
    let last_fallible = job
        .steps
        .iter()
        .rposition(|s| matches!(s, Step::RunCommand { .. } | Step::ProvisionToolchain));
    let first_save = job
        .steps
        .iter()
        .position(|s| matches!(s, Step::SaveCache { .. }));
    if let (Some(fallible), Some(save)) = (last_fallible, first_save) {
        if save < fallible {
            return Err(ConfigError::StepOrder {
                job: job.name.clone(),
                message: "a cache save precedes a step that can still fail".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::workflow::{ExecutionEnvironment, ToolchainSpec};

    fn job(name: &str, steps: Vec<Step>) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            toolchain: ToolchainSpec {
                name: "stable".to_string(),
                profile: "minimal".to_string(),
                components: vec![],
            },
            steps,
            environment: ExecutionEnvironment::default(),
        }
    }

    fn run(command: &str) -> Step {
        Step::RunCommand {
            command: command.to_string(),
        }
    }

    #[test]
    fn test_one_node_per_job_order_preserved() {
        let jobs = vec![
            job("lint", vec![run("cargo fmt --check")]),
            job("test", vec![run("cargo test")]),
        ];
        let graph = RunGraph::build(&jobs).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.nodes()[0].spec.name, "lint");
        assert_eq!(graph.nodes()[1].spec.name, "test");
    }

    #[test]
    fn test_empty_steps_rejected() {
        let jobs = vec![job("lint", vec![])];
        let result = RunGraph::build(&jobs);
        assert!(matches!(result.unwrap_err(), ConfigError::EmptySteps(_)));
    }

    #[test]
    fn test_command_before_provision_rejected() {
        let jobs = vec![job(
            "lint",
            vec![run("cargo fmt --check"), Step::ProvisionToolchain],
        )];
        let result = RunGraph::build(&jobs);
        assert!(matches!(result.unwrap_err(), ConfigError::StepOrder { .. }));
    }

    #[test]
    fn test_provision_first_accepted() {
        let jobs = vec![job(
            "lint",
            vec![Step::ProvisionToolchain, run("cargo fmt --check")],
        )];
        assert!(RunGraph::build(&jobs).is_ok());
    }

    #[test]
    fn test_save_before_command_rejected() {
        let jobs = vec![job(
            "test",
            vec![
                Step::SaveCache {
                    cache: "cargo".to_string(),
                },
                run("cargo test"),
            ],
        )];
        let result = RunGraph::build(&jobs);
        assert!(matches!(result.unwrap_err(), ConfigError::StepOrder { .. }));
    }

    #[test]
    fn test_save_after_last_command_accepted() {
        let jobs = vec![job(
            "test",
            vec![
                run("cargo test"),
                Step::SaveCache {
                    cache: "cargo".to_string(),
                },
            ],
        )];
        assert!(RunGraph::build(&jobs).is_ok());
    }

    #[test]
    fn test_no_provision_step_accepted() {
        let jobs = vec![job("lint", vec![run("cargo fmt --check")])];
        assert!(RunGraph::build(&jobs).is_ok());
    }

    #[test]
    fn test_build_is_deterministic() {
        let jobs = vec![
            job("lint", vec![run("a")]),
            job("test", vec![run("b")]),
        ];
        let a = RunGraph::build(&jobs).unwrap();
        let b = RunGraph::build(&jobs).unwrap();
        let names = |g: &RunGraph| {
            g.nodes()
                .iter()
                .map(|n| n.spec.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&a), names(&b));
    }
}
