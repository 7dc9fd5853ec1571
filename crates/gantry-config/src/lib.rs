//! KDL configuration parsing for the Gantry CI engine.
//!
//! This crate handles parsing and validation of workflow definitions
//! (gantry.kdl): triggers with path filters, jobs with their steps and
//! toolchains, and cache declarations. Every configuration problem is a
//! [`ConfigError`] raised here at load time; nothing malformed reaches
//! the engine.

pub mod error;
pub mod workflow;

pub use error::{ConfigError, ConfigResult};
pub use workflow::{load_workflow, parse_workflow};
