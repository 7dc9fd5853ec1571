//! Events and path filtering.

use glob::{Pattern, PatternError};
use serde::{Deserialize, Serialize};

/// What kind of upstream activity produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A push to a branch.
    Push,
    /// A pull request was opened or updated.
    PullRequest,
    /// A manual dispatch by an operator.
    Manual,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Push => write!(f, "push"),
            EventKind::PullRequest => write!(f, "pull_request"),
            EventKind::Manual => write!(f, "manual"),
        }
    }
}

/// An incoming event, created by the upstream VCS integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Paths changed by the commit(s) behind this event. Empty for manual
    /// dispatch.
    pub changed_paths: Vec<String>,
}

impl Event {
    pub fn new(kind: EventKind, changed_paths: Vec<String>) -> Self {
        Self {
            kind,
            changed_paths,
        }
    }

    /// A manual dispatch event carries no change set.
    pub fn manual() -> Self {
        Self {
            kind: EventKind::Manual,
            changed_paths: Vec::new(),
        }
    }
}

/// An ordered set of ignore globs evaluated against an event's changed paths.
///
/// Patterns are compiled once at configuration load; a malformed glob is a
/// load-time error and never surfaces during evaluation.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Pattern>,
}

impl PathFilter {
    /// Compile a list of glob sources into a filter.
    pub fn new<I, S>(sources: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = sources
            .into_iter()
            .map(|s| Pattern::new(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether a single path matches at least one ignore pattern.
    pub fn ignores(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    /// Whether every path in the set matches at least one ignore pattern.
    ///
    /// Vacuously true for an empty set: an event that changed nothing carries
    /// no work worth running.
    pub fn ignores_all<'a, I>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths.into_iter().all(|p| self.ignores(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_glob_is_rejected() {
        assert!(PathFilter::new(["docs/[".to_string()]).is_err());
    }

    #[test]
    fn test_ignores_single_path() {
        let filter = PathFilter::new(["docs/**", "*.md"]).unwrap();
        assert!(filter.ignores("docs/guide/intro.txt"));
        assert!(filter.ignores("README.md"));
        assert!(!filter.ignores("src/main.rs"));
    }

    #[test]
    fn test_ignores_all() {
        let filter = PathFilter::new(["docs/**"]).unwrap();
        assert!(filter.ignores_all(["docs/a.txt", "docs/b/c.txt"]));
        assert!(!filter.ignores_all(["docs/a.txt", "src/lib.rs"]));
    }
}
