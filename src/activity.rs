//! In-memory log of registry changes made through [`crate::service::Forge`].
//!
//! The log keeps the newest [`MAX_ACTIVITY_ENTRIES`] entries, newest first.
//! It is not persisted.

use crate::constants::MAX_ACTIVITY_ENTRIES;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Kind of operation recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityAction {
    Enable,
    Disable,
    Add,
    Delete,
    Import,
    SetTools,
    Install,
    HealthCheck,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Import => "import",
            Self::SetTools => "set-tools",
            Self::Install => "install",
            Self::HealthCheck => "health-check",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: ActivityAction,
    pub server_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Bounded activity log. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<ActivityEntry>>>,
    sequence: Arc<AtomicU64>,
}

impl ActivityLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ActivityEntry>> {
        // A panic while holding the lock cannot leave the deque inconsistent
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record an entry and return it.
    pub fn record(
        &self,
        action: ActivityAction,
        server_name: impl Into<String>,
        detail: Option<String>,
    ) -> ActivityEntry {
        let timestamp = Utc::now();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let entry = ActivityEntry {
            id: format!("{}-{sequence}", timestamp.timestamp_millis()),
            timestamp,
            action,
            server_name: server_name.into(),
            detail,
        };
        tracing::debug!("Activity: {} {}", entry.action, entry.server_name);

        let mut entries = self.lock();
        entries.push_front(entry.clone());
        entries.truncate(MAX_ACTIVITY_ENTRIES);
        entry
    }

    /// Snapshot of the log, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
