use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::CycleError;
use crate::ingestion::HeadlineSource;
use crate::snapshot::{NewsSnapshot, SnapshotStore};

/// Outcome of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub headlines: usize,
    /// Feeds that returned at least one headline
    pub feeds_ok: usize,
    pub feeds_total: usize,
}

/// Fetches every configured feed, joins the titles and publishes the result.
///
/// The aggregator is the only writer of its [`SnapshotStore`].
#[derive(Clone)]
pub struct Aggregator {
    source: Arc<dyn HeadlineSource>,
    feeds: Arc<Vec<String>>,
    separator: String,
    failed_placeholder: String,
    store: SnapshotStore,
}

impl Aggregator {
    pub fn new(
        source: Arc<dyn HeadlineSource>,
        feeds: Vec<String>,
        separator: impl Into<String>,
        failed_placeholder: impl Into<String>,
        store: SnapshotStore,
    ) -> Self {
        Self {
            source,
            feeds: Arc::new(feeds),
            separator: separator.into(),
            failed_placeholder: failed_placeholder.into(),
            store,
        }
    }

    pub fn from_config(config: &common::Config, source: Arc<dyn HeadlineSource>, store: SnapshotStore) -> Self {
        Self::new(
            source,
            config.feeds.urls.clone(),
            config.feeds.separator.clone(),
            config.messages.failed.clone(),
            store,
        )
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Fetch all feeds concurrently and render the joined headline string.
    ///
    /// Output order follows the feed list, then item order within a feed,
    /// regardless of which fetch finishes first.
    pub async fn collect(&self) -> Result<(String, CycleReport), CycleError> {
        let fetches = self.feeds.iter().map(|url| self.source.fetch(url));
        let results = join_all(fetches).await;

        let feeds_ok = results.iter().filter(|items| !items.is_empty()).count();
        let titles: Vec<String> = results
            .into_iter()
            .flatten()
            .map(|item| item.title)
            .collect();

        if titles.is_empty() {
            return Err(CycleError::NoHeadlines {
                feeds: self.feeds.len(),
            });
        }

        let report = CycleReport {
            headlines: titles.len(),
            feeds_ok,
            feeds_total: self.feeds.len(),
        };
        Ok((titles.join(&self.separator), report))
    }

    /// Run one fetch → merge → publish cycle.
    ///
    /// A failed cycle publishes the `Failed` placeholder; the error is
    /// logged and returned for callers that want to report it.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        match self.collect().await {
            Ok((text, report)) => {
                self.store.write(NewsSnapshot::ready(text, report.headlines));
                info!(
                    headlines = report.headlines,
                    feeds_ok = report.feeds_ok,
                    feeds_total = report.feeds_total,
                    "news cycle complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.mark_failed(&e);
                Err(e)
            }
        }
    }

    fn mark_failed(&self, cause: &CycleError) {
        error!(error = %cause, "news cycle failed");
        self.store.write(NewsSnapshot::failed(self.failed_placeholder.clone()));
    }

    fn handle_join_error(&self, err: JoinError) {
        if err.is_panic() {
            let msg = panic_message(err);
            self.mark_failed(&CycleError::Panicked(msg));
        }
    }

    /// Start the refresh worker: one cycle immediately, then one per `interval`.
    pub fn spawn(self, interval: Duration) -> AggregatorHandle {
        let shutdown = Arc::new(Notify::new());
        let worker_shutdown = shutdown.clone();
        let task = tokio::spawn(async move {
            self.run_worker(interval, worker_shutdown).await;
        });
        AggregatorHandle { shutdown, task }
    }

    /// Scheduler loop. Each tick starts an independent cycle task, so a slow
    /// cycle never delays the next tick; the cycle that completes last owns
    /// the published snapshot. In-flight cycles are aborted on shutdown.
    pub async fn run_worker(&self, interval: Duration, shutdown: Arc<Notify>) {
        info!(
            feeds = self.feeds.len(),
            interval_secs = interval.as_secs(),
            "worker: starting news refresh"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !cycles.is_empty() {
                        warn!(in_flight = cycles.len(), "worker: previous cycle still running, starting another");
                    }
                    let agg = self.clone();
                    cycles.spawn(async move {
                        // Failures are already published and logged by run_cycle.
                        let _ = agg.run_cycle().await;
                    });
                }
                Some(res) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = res {
                        self.handle_join_error(e);
                    }
                }
                _ = shutdown.notified() => {
                    info!("worker: shutdown requested, exiting loop");
                    break;
                }
            }
        }

        cycles.shutdown().await;
        info!("worker: cleanup complete");
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(e) => e.to_string(),
    }
}

/// Owner handle of the background refresh worker.
pub struct AggregatorHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl AggregatorHandle {
    /// Ask the worker to stop after its current select iteration.
    pub fn shutdown(&self) {
        // notify_one keeps a permit if the worker is not parked on notified().
        self.shutdown.notify_one();
    }

    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
