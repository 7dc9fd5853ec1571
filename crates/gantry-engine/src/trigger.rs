//! Trigger evaluation: does an event start a run?

use gantry_core::event::{Event, EventKind, PathFilter};
use gantry_core::workflow::WorkflowSpec;
use tracing::debug;

/// Evaluate one event against one path filter.
///
/// Manual dispatch always runs; no path filtering applies. Otherwise the
/// event is suppressed iff every changed path matches at least one ignore
/// pattern. An event with an empty change set is suppressed: it carries
/// nothing to check.
///
/// Pure; filters were validated at configuration load, so nothing here
/// can fail.
pub fn should_run(event: &Event, filter: &PathFilter) -> bool {
    if event.kind == EventKind::Manual {
        return true;
    }
    !filter.ignores_all(event.changed_paths.iter().map(String::as_str))
}

/// Evaluate an event against a workflow: find the trigger rule for the
/// event's kind and apply its filter. No matching rule means no run.
pub fn evaluate(event: &Event, workflow: &WorkflowSpec) -> bool {
    if event.kind == EventKind::Manual {
        return true;
    }
    let Some(rule) = workflow.triggers.iter().find(|t| t.on == event.kind) else {
        debug!(kind = %event.kind, "No trigger for event kind");
        return false;
    };
    should_run(event, &rule.paths_ignore)
}
