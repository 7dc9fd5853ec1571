//! Configuration parsing errors.
//!
//! ConfigError is the only run-fatal error in the system: a workflow that
//! fails to load never starts a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KDL parse error: {0}")]
    Parse(#[from] kdl::KdlError),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("duplicate definition: {0}")]
    Duplicate(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("malformed glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("job '{0}' has no steps")]
    EmptySteps(String),

    #[error("job '{job}': {message}")]
    StepOrder { job: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
