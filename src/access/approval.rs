//! One-time approval tokens for package installation.
//!
//! A package path becomes installable only after the user picks it through a
//! trusted selection surface (a file picker, or the CLI argument itself).
//! The selection calls [`ApprovalTokenSet::approve`]; an installation calls
//! [`ApprovalTokenSet::consume`], which removes the token in a single atomic
//! step. Two concurrent installs of the same path therefore race for one
//! token and exactly one of them observes it.

use super::canonicalize;
use dashmap::DashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Process-lifetime set of canonical package paths approved for installation.
///
/// Cloning is cheap and every clone shares the same set, so the selection
/// handler and the installer can each hold one.
#[derive(Debug, Clone, Default)]
pub struct ApprovalTokenSet {
    tokens: Arc<DashSet<PathBuf>>,
}

impl ApprovalTokenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the user selected `path`.
    pub fn approve(&self, path: &Path) {
        let canonical = canonicalize(path);
        tracing::debug!("Approved package path {}", canonical.display());
        self.tokens.insert(canonical);
    }

    /// Check for a token without consuming it.
    #[must_use]
    pub fn is_approved(&self, path: &Path) -> bool {
        self.tokens.contains(&canonicalize(path))
    }

    /// Atomically remove the token for `path`.
    ///
    /// Returns `true` only for the single caller that removed it.
    #[must_use]
    pub fn consume(&self, path: &Path) -> bool {
        self.tokens.remove(&canonicalize(path)).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
