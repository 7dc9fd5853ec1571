//! Result aggregation.

use gantry_core::result::{JobResult, RunResult, RunStatus};

/// Fold per-node results into one run result.
///
/// Fail iff any node reported a non-zero exit code. The input order is
/// preserved: callers hand results in graph node order, so reporting stays
/// deterministic regardless of completion order. No retries happen here.
pub fn aggregate(job_results: Vec<JobResult>) -> RunResult {
    let overall_status = if job_results.iter().all(|r| r.exit_code == 0) {
        RunStatus::Pass
    } else {
        RunStatus::Fail
    };
    RunResult {
        overall_status,
        job_results,
    }
}
