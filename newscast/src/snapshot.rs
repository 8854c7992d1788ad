use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Lifecycle state of the published headline text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Loading,
    Ready,
    Failed,
}

/// The single process-wide aggregated news text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsSnapshot {
    pub status: SnapshotStatus,
    pub text: String,
    pub headline_count: usize,
    /// Completion time of the cycle that produced this snapshot
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewsSnapshot {
    pub fn loading(placeholder: impl Into<String>) -> Self {
        Self {
            status: SnapshotStatus::Loading,
            text: placeholder.into(),
            headline_count: 0,
            updated_at: None,
        }
    }

    pub fn ready(text: impl Into<String>, headline_count: usize) -> Self {
        Self {
            status: SnapshotStatus::Ready,
            text: text.into(),
            headline_count,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn failed(placeholder: impl Into<String>) -> Self {
        Self {
            status: SnapshotStatus::Failed,
            text: placeholder.into(),
            headline_count: 0,
            updated_at: Some(Utc::now()),
        }
    }
}

/// Shared cell holding the current [`NewsSnapshot`].
///
/// Writes replace the whole snapshot by swapping an `Arc`; reads clone that
/// `Arc`, so a reader holds either the previous or the new snapshot in full
/// and never keeps the lock beyond the pointer copy.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    current: Arc<RwLock<Arc<NewsSnapshot>>>,
}

impl SnapshotStore {
    pub fn new(initial: NewsSnapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Store starting in the `Loading` state with the given placeholder.
    pub fn loading(placeholder: impl Into<String>) -> Self {
        Self::new(NewsSnapshot::loading(placeholder))
    }

    pub fn write(&self, snapshot: NewsSnapshot) {
        let next = Arc::new(snapshot);
        // A poisoned lock still holds a complete Arc; keep serving it.
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }

    pub fn read_current(&self) -> Arc<NewsSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }
}
