//! Workflow configuration parsing.
//!
//! A workflow document looks like:
//!
//! ```kdl
//! workflow "rust-ci"
//!
//! on "push" paths-ignore="docs/**" paths-ignore="*.md"
//! on "pull_request"
//! on "manual"
//!
//! cache "cargo" {
//!     path "target/ci-cache.bin"
//!     lockfile "Cargo.lock"
//! }
//!
//! job "lint" {
//!     toolchain "stable" profile="minimal" components="rustfmt" components="clippy"
//!     provision
//!     run "cargo fmt --all -- --check"
//!     run "cargo clippy --all-targets -- -D warnings"
//! }
//! ```

use crate::{ConfigError, ConfigResult};
use gantry_core::event::{EventKind, PathFilter};
use gantry_core::workflow::{
    CacheSpec, ExecutionEnvironment, JobSpec, Step, ToolchainSpec, TriggerRule, WorkflowSpec,
};
use kdl::{KdlDocument, KdlNode};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Load and parse a workflow definition from a file.
pub fn load_workflow(path: impl AsRef<Path>) -> ConfigResult<WorkflowSpec> {
    let text = std::fs::read_to_string(path)?;
    parse_workflow(&text)
}

/// Parse a workflow definition from KDL text.
pub fn parse_workflow(kdl: &str) -> ConfigResult<WorkflowSpec> {
    let doc: KdlDocument = kdl.parse()?;

    let mut name = String::new();
    let mut triggers = Vec::new();
    let mut jobs: Vec<JobSpec> = Vec::new();
    let mut caches: Vec<CacheSpec> = Vec::new();
    let mut env = HashMap::new();

    for node in doc.nodes() {
        match node.name().value() {
            "workflow" => {
                name = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("workflow name".to_string()))?;
            }
            "on" => {
                triggers.push(parse_trigger(node)?);
            }
            "job" => {
                jobs.push(parse_job(node)?);
            }
            "cache" => {
                caches.push(parse_cache(node)?);
            }
            "env" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        let key = child.name().value().to_string();
                        if let Some(val) = get_first_string_arg(child) {
                            env.insert(key, val);
                        }
                    }
                }
            }
            _ => {} // Ignore unknown nodes
        }
    }

    if name.is_empty() {
        return Err(ConfigError::MissingField("workflow name".to_string()));
    }
    if jobs.is_empty() {
        return Err(ConfigError::MissingField("at least one job".to_string()));
    }

    // Reject duplicate job and cache names
    let mut seen = Vec::new();
    for job in &jobs {
        if seen.contains(&job.name.as_str()) {
            return Err(ConfigError::Duplicate(format!("job '{}'", job.name)));
        }
        seen.push(job.name.as_str());
    }
    let mut seen = Vec::new();
    for cache in &caches {
        if seen.contains(&cache.name.as_str()) {
            return Err(ConfigError::Duplicate(format!("cache '{}'", cache.name)));
        }
        seen.push(cache.name.as_str());
    }

    // Every cache a step references must be declared
    let cache_names: Vec<&str> = caches.iter().map(|c| c.name.as_str()).collect();
    for job in &jobs {
        for step in &job.steps {
            let referenced = match step {
                Step::RestoreCache { cache } | Step::SaveCache { cache } => Some(cache.as_str()),
                _ => None,
            };
            if let Some(cache) = referenced {
                if !cache_names.contains(&cache) {
                    return Err(ConfigError::InvalidReference(format!(
                        "job '{}' references unknown cache '{}'",
                        job.name, cache
                    )));
                }
            }
        }
    }

    Ok(WorkflowSpec {
        name,
        triggers,
        jobs,
        caches,
        env,
    })
}

fn parse_trigger(node: &KdlNode) -> ConfigResult<TriggerRule> {
    let kind = get_first_string_arg(node).unwrap_or_default();

    let on = match kind.as_str() {
        "push" => EventKind::Push,
        "pull_request" => EventKind::PullRequest,
        "manual" | "" => EventKind::Manual,
        _ => {
            return Err(ConfigError::InvalidValue {
                field: "trigger kind".to_string(),
                message: format!("unknown trigger kind: {}", kind),
            });
        }
    };

    // Malformed globs fail here, at load, never at evaluation
    let patterns = get_string_list_prop(node, "paths-ignore");
    let paths_ignore = PathFilter::new(&patterns)?;

    Ok(TriggerRule { on, paths_ignore })
}

fn parse_job(node: &KdlNode) -> ConfigResult<JobSpec> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("job name".to_string()))?;

    let mut toolchain = None;
    let mut steps = Vec::new();
    let mut env = HashMap::new();
    let mut test_concurrency = None;
    let mut step_timeout = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "toolchain" => {
                    toolchain = Some(parse_toolchain(child)?);
                }
                "provision" => {
                    steps.push(Step::ProvisionToolchain);
                }
                "restore-cache" => {
                    let cache = get_first_string_arg(child).ok_or_else(|| {
                        ConfigError::MissingField(format!("cache name in job '{}'", name))
                    })?;
                    steps.push(Step::RestoreCache { cache });
                }
                "run" => {
                    let command = get_first_string_arg(child).ok_or_else(|| {
                        ConfigError::MissingField(format!("command in job '{}'", name))
                    })?;
                    steps.push(Step::RunCommand { command });
                }
                "save-cache" => {
                    let cache = get_first_string_arg(child).ok_or_else(|| {
                        ConfigError::MissingField(format!("cache name in job '{}'", name))
                    })?;
                    steps.push(Step::SaveCache { cache });
                }
                "test-threads" => {
                    let threads = get_first_int_arg(child).ok_or_else(|| {
                        ConfigError::InvalidValue {
                            field: format!("test-threads in job '{}'", name),
                            message: "expected an integer".to_string(),
                        }
                    })?;
                    let threads =
                        u32::try_from(threads).map_err(|_| ConfigError::InvalidValue {
                            field: format!("test-threads in job '{}'", name),
                            message: format!("must be a non-negative integer, got {threads}"),
                        })?;
                    test_concurrency = Some(threads);
                }
                "timeout" => {
                    let secs =
                        get_first_int_arg(child).ok_or_else(|| ConfigError::InvalidValue {
                            field: format!("timeout in job '{}'", name),
                            message: "expected seconds as an integer".to_string(),
                        })?;
                    let secs = u64::try_from(secs).map_err(|_| ConfigError::InvalidValue {
                        field: format!("timeout in job '{}'", name),
                        message: format!("must be non-negative seconds, got {secs}"),
                    })?;
                    step_timeout = Some(Duration::from_secs(secs));
                }
                "env" => {
                    if let Some(grandchildren) = child.children() {
                        for gc in grandchildren.nodes() {
                            let key = gc.name().value().to_string();
                            if let Some(val) = get_first_string_arg(gc) {
                                env.insert(key, val);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let toolchain = toolchain
        .ok_or_else(|| ConfigError::MissingField(format!("toolchain for job '{}'", name)))?;

    Ok(JobSpec {
        name,
        toolchain,
        steps,
        environment: ExecutionEnvironment {
            env,
            test_concurrency,
            step_timeout,
        },
    })
}

fn parse_toolchain(node: &KdlNode) -> ConfigResult<ToolchainSpec> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("toolchain name".to_string()))?;
    let profile = get_string_prop(node, "profile").unwrap_or_else(|| "minimal".to_string());
    let components = get_string_list_prop(node, "components");

    Ok(ToolchainSpec {
        name,
        profile,
        components,
    })
}

fn parse_cache(node: &KdlNode) -> ConfigResult<CacheSpec> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("cache name".to_string()))?;

    let mut path = String::new();
    let mut lockfile = String::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "path" => {
                    path = get_first_string_arg(child).unwrap_or_default();
                }
                "lockfile" => {
                    lockfile = get_first_string_arg(child).unwrap_or_default();
                }
                _ => {}
            }
        }
    }

    if path.is_empty() {
        return Err(ConfigError::MissingField(format!(
            "path for cache '{}'",
            name
        )));
    }
    if lockfile.is_empty() {
        return Err(ConfigError::MissingField(format!(
            "lockfile for cache '{}'",
            name
        )));
    }

    Ok(CacheSpec {
        name,
        path,
        lockfile,
    })
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_first_int_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

/// Collect a repeated string property (e.g. `paths-ignore="a" paths-ignore="b"`).
fn get_string_list_prop(node: &KdlNode, name: &str) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().map(|n| n.value() == name).unwrap_or(false))
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINT_AND_TEST: &str = r#"
        workflow "rust-ci"

        on "push" paths-ignore="docs/**" paths-ignore="*.md"
        on "pull_request"

        cache "cargo" {
            path "target/ci-cache.bin"
            lockfile "Cargo.lock"
        }

        job "lint" {
            toolchain "stable" profile="minimal" components="rustfmt" components="clippy"
            provision
            restore-cache "cargo"
            run "cargo fmt --all -- --check"
            run "cargo clippy --all-targets -- -D warnings"
            save-cache "cargo"
        }

        job "test" {
            toolchain "stable"
            test-threads 1
            timeout 1800
            provision
            run "cargo test --no-run"
            run "cargo test"
            env {
                RUST_BACKTRACE "1"
            }
        }
    "#;

    #[test]
    fn test_parse_full_workflow() {
        let workflow = parse_workflow(LINT_AND_TEST).unwrap();
        assert_eq!(workflow.name, "rust-ci");
        assert_eq!(workflow.triggers.len(), 2);
        assert_eq!(workflow.jobs.len(), 2);
        assert_eq!(workflow.caches.len(), 1);

        let lint = &workflow.jobs[0];
        assert_eq!(lint.name, "lint");
        assert_eq!(lint.steps.len(), 5);
        assert_eq!(lint.steps[0], Step::ProvisionToolchain);
        assert_eq!(
            lint.toolchain.components,
            vec!["rustfmt".to_string(), "clippy".to_string()]
        );

        let test = &workflow.jobs[1];
        assert_eq!(test.environment.test_concurrency, Some(1));
        assert_eq!(
            test.environment.step_timeout,
            Some(Duration::from_secs(1800))
        );
        assert_eq!(test.environment.env.get("RUST_BACKTRACE").unwrap(), "1");
    }

    #[test]
    fn test_trigger_path_filters_compiled_at_load() {
        let workflow = parse_workflow(LINT_AND_TEST).unwrap();
        let push = &workflow.triggers[0];
        assert_eq!(push.on, EventKind::Push);
        assert!(push.paths_ignore.ignores("docs/book/intro.txt"));
        assert!(push.paths_ignore.ignores("CHANGELOG.md"));
        assert!(!push.paths_ignore.ignores("src/lib.rs"));
    }

    #[test]
    fn test_malformed_glob_fails_at_load() {
        let kdl = r#"
            workflow "bad-glob"
            on "push" paths-ignore="docs/["
            job "lint" {
                toolchain "stable"
                run "cargo fmt --check"
            }
        "#;
        let result = parse_workflow(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::Glob(_)));
    }

    #[test]
    fn test_unknown_cache_reference() {
        let kdl = r#"
            workflow "bad-cache"
            job "lint" {
                toolchain "stable"
                restore-cache "nonexistent"
                run "cargo fmt --check"
            }
        "#;
        let result = parse_workflow(kdl);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidReference(_)
        ));
    }

    #[test]
    fn test_duplicate_job_names() {
        let kdl = r#"
            workflow "dupes"
            job "lint" {
                toolchain "stable"
                run "true"
            }
            job "lint" {
                toolchain "stable"
                run "true"
            }
        "#;
        let result = parse_workflow(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::Duplicate(_)));
    }

    #[test]
    fn test_missing_toolchain() {
        let kdl = r#"
            workflow "no-toolchain"
            job "lint" {
                run "cargo fmt --check"
            }
        "#;
        let result = parse_workflow(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::MissingField(_)));
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let kdl = r#"
            workflow "bad-timeout"
            job "test" {
                toolchain "stable"
                timeout -5
                run "cargo test"
            }
        "#;
        let result = parse_workflow(kdl);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_negative_test_threads_rejected() {
        let kdl = r#"
            workflow "bad-threads"
            job "test" {
                toolchain "stable"
                test-threads -1
                run "cargo test"
            }
        "#;
        let result = parse_workflow(kdl);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_unknown_trigger_kind() {
        let kdl = r#"
            workflow "bad-trigger"
            on "cron"
            job "lint" {
                toolchain "stable"
                run "true"
            }
        "#;
        let result = parse_workflow(kdl);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }
}
