//! Run orchestration for the Gantry CI engine.
//!
//! Wires the pieces together: decide whether an event starts a run
//! (trigger), expand the job set into a graph of nodes (graph), execute
//! nodes in parallel with error isolation (run), and fold node results
//! into one pass/fail status (aggregate).

pub mod aggregate;
pub mod graph;
pub mod run;
pub mod trigger;

pub use aggregate::aggregate;
pub use graph::{JobNode, RunGraph};
pub use run::{RunEvent, RunSupervisor};
pub use trigger::should_run;
