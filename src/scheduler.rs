use crate::data::{parse_records, ParseError};
use crate::processing::Projector;
use crate::source::{CsvSource, FetchError};
use crate::store::SnapshotStore;
use crate::types::Snapshot;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Fetch, parse and project once. Used for both the first load and every tick.
pub async fn build_snapshot<S: CsvSource>(
    source: &S,
    projector: &Projector,
) -> Result<Snapshot, RefreshError> {
    let bytes = source.fetch().await?;
    let records = parse_records(&bytes)?;
    let (map, table) = projector.project(&records);
    Ok(Snapshot {
        map,
        table,
        fetched_at: Utc::now(),
    })
}

/// Runs the refresh pipeline on a fixed period and publishes into the store.
///
/// Refreshes never overlap: the loop awaits each one before taking the next
/// tick, and ticks missed while a slow fetch was in flight are skipped.
pub struct Scheduler<S> {
    source: S,
    projector: Projector,
    store: Arc<SnapshotStore>,
    period: Duration,
    ticks: u64,
}

impl<S: CsvSource> Scheduler<S> {
    pub fn new(
        source: S,
        projector: Projector,
        store: Arc<SnapshotStore>,
        period: Duration,
    ) -> Self {
        Self {
            source,
            projector,
            store,
            period,
            ticks: 0,
        }
    }

    /// One `Idle -> Refreshing -> Idle` cycle. On failure the published
    /// snapshot is left as it was.
    pub async fn refresh(&mut self) -> Result<usize, RefreshError> {
        self.ticks += 1;
        self.store.begin_refresh(self.ticks);

        let result = build_snapshot(&self.source, &self.projector).await;
        let outcome = match result {
            Ok(snapshot) => {
                let rows = snapshot.table.rows.len();
                self.store.publish(snapshot);
                info!(tick = self.ticks, rows, "published snapshot");
                Ok(rows)
            }
            Err(e) => {
                warn!(tick = self.ticks, error = %e, "refresh failed, keeping previous snapshot");
                self.store.record_failure(e.to_string());
                Err(e)
            }
        };

        self.store.finish_refresh();
        outcome
    }

    /// Tick until `shutdown` flips or its sender is dropped. The first tick
    /// fires immediately.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period = ?self.period, "scheduler starting");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Failures are already recorded in the store.
                    let _ = self.refresh().await;
                }
                _ = shutdown.changed() => {
                    debug!("shutdown signalled");
                    break;
                }
            }
        }
        info!(ticks = self.ticks, "scheduler stopped");
    }
}
