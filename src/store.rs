use crate::nearest::ZoneIndex;
use crate::types::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshStatus {
    pub state: SchedulerState,
    pub ticks: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub rows: usize,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            ticks: 0,
            last_updated: None,
            last_attempt: None,
            last_error: None,
            consecutive_failures: 0,
            rows: 0,
        }
    }
}

impl RefreshStatus {
    /// No successful refresh within three periods (or ever).
    pub fn is_stale(&self, now: DateTime<Utc>, period: Duration) -> bool {
        let Some(last) = self.last_updated else {
            return true;
        };
        let window = period
            .checked_mul(3)
            .and_then(|w| chrono::Duration::from_std(w).ok())
            .unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(last) > window
    }
}

/// A published snapshot together with its lookup index.
pub struct Published {
    pub snapshot: Snapshot,
    pub zones: ZoneIndex,
}

/// Holder of the current snapshot. Publishing replaces the whole value;
/// readers keep whatever `Arc` they cloned.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Published>>>,
    status: RwLock<RefreshStatus>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Published>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        let rows = snapshot.table.rows.len();
        let fetched_at = snapshot.fetched_at;
        let zones = ZoneIndex::build(&snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(Published { snapshot, zones }));

        self.update_status(|status| {
            status.last_updated = Some(fetched_at);
            status.last_error = None;
            status.consecutive_failures = 0;
            status.rows = rows;
        });
    }

    pub(crate) fn begin_refresh(&self, tick: u64) {
        self.update_status(|status| {
            status.state = SchedulerState::Refreshing;
            status.ticks = tick;
            status.last_attempt = Some(Utc::now());
        });
    }

    pub(crate) fn record_failure(&self, error: String) {
        self.update_status(|status| {
            status.last_error = Some(error);
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
        });
    }

    pub(crate) fn finish_refresh(&self) {
        self.update_status(|status| status.state = SchedulerState::Idle);
    }

    fn update_status(&self, f: impl FnOnce(&mut RefreshStatus)) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut status);
    }
}
