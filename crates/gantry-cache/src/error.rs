//! Cache errors.
//!
//! Never run-fatal: callers downgrade every variant to a miss or a no-op.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lockfile unreadable: {path}: {source}")]
    Lockfile {
        path: String,
        source: std::io::Error,
    },
}
