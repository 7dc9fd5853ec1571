//! Run identifiers.

use derive_more::Display;
use uuid::Uuid;

/// Identifier stamped on one workflow run. UUIDv7, so identifiers sort by
/// start time in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{_0}")]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}
