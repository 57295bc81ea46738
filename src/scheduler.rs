//! Refresh scheduler
//!
//! One worker task runs refresh cycles strictly one after another. It wakes on
//! its interval tick (when auto refresh is on) or on a manual trigger. Triggers
//! go through a capacity-1 channel, so any number of them arriving during a
//! cycle collapse into a single follow-up cycle, and ticks that fall due while
//! a cycle runs are skipped. Changing the period never interrupts a cycle.
//!
//! Results are published as [`AppEvent::Refreshed`]; the receiver reconciles
//! them against whatever selection it holds when the event arrives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::error::RefreshError;
use crate::provider::{read_batch, FileSystemProvider};
use crate::snapshot::{SkippedFile, Snapshot, SnapshotBuilder};
use crate::types::AppEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// At least one bundle survived filtering
    Snapshot(Snapshot),
    /// Nothing usable in the directory; not fatal
    NoData { skipped: Vec<SkippedFile> },
    /// The directory itself could not be read
    Failed(RefreshError),
}

/// Reads the directory and builds a snapshot. One call is one cycle.
pub struct RefreshEngine {
    provider: Arc<dyn FileSystemProvider>,
    builder: SnapshotBuilder,
    // node count of the previous cycle; usize::MAX before the first one
    last_node_count: AtomicUsize,
}

impl RefreshEngine {
    pub fn new(provider: Arc<dyn FileSystemProvider>, builder: SnapshotBuilder) -> Self {
        Self {
            provider,
            builder,
            last_node_count: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn builder(&self) -> &SnapshotBuilder {
        &self.builder
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let batch = match read_batch(self.provider.as_ref()).await {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("❌ Refresh failed: {e}");
                return RefreshOutcome::Failed(RefreshError::from(e));
            }
        };

        let snapshot = self
            .builder
            .build(&batch.files)
            .with_skipped(batch.skipped);

        self.note_node_count(snapshot.len());
        if snapshot.is_empty() {
            log::warn!("💤 {}", self.builder.mode().no_data_message());
            return RefreshOutcome::NoData {
                skipped: snapshot.skipped().to_vec(),
            };
        }

        log::debug!(
            "✅ Snapshot with {} nodes ({} files skipped)",
            snapshot.len(),
            snapshot.skipped().len()
        );
        RefreshOutcome::Snapshot(snapshot)
    }

    /// Record this cycle's node count. Returns true when it differs from the
    /// previous cycle's.
    fn note_node_count(&self, count: usize) -> bool {
        let prev = self.last_node_count.swap(count, Ordering::Relaxed);
        if prev == count {
            return false;
        }
        if prev == usize::MAX {
            log::info!("📦 {count} nodes in snapshot");
        } else {
            log::info!("📦 Node count changed: {prev} → {count}");
        }
        true
    }
}

/// Owns the single refresh worker. Dropping the scheduler cancels it.
///
/// The worker lives for the whole session. `start` and `stop` only change its
/// period, so a cycle that is already reading always runs to completion and
/// publishes its result.
pub struct RefreshScheduler {
    engine: Arc<RefreshEngine>,
    events: UnboundedSender<AppEvent>,
    worker: Option<Worker>,
}

struct Worker {
    handle: JoinHandle<()>,
    trigger: mpsc::Sender<()>,
    period: watch::Sender<Option<Duration>>,
}

impl RefreshScheduler {
    pub fn new(engine: RefreshEngine, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            engine: Arc::new(engine),
            events,
            worker: None,
        }
    }

    /// Refresh now and then every `period`. Replaces any previous period; a
    /// cycle in flight finishes first.
    pub fn start(&mut self, period: Duration) {
        log::info!("🚀 Auto refresh every {} ms", period.as_millis());
        self.worker().period.send_replace(Some(period));
    }

    /// Stop periodic refreshes. Manual triggers keep working.
    pub fn stop(&mut self) {
        if self.is_running() {
            log::info!("⏸️ Auto refresh stopped");
            self.worker().period.send_replace(None);
        }
    }

    /// Request one cycle. Coalesces with a trigger that is already pending.
    pub fn trigger_once(&mut self) {
        match self.worker().trigger.try_send(()) {
            Ok(()) => log::debug!("🔄 Manual refresh requested"),
            Err(TrySendError::Full(())) => log::debug!("🔄 Refresh already pending"),
            Err(TrySendError::Closed(())) => log::warn!("⚠️ Refresh worker is gone"),
        }
    }

    /// Whether periodic refresh is active.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.period.borrow().is_some() && !w.handle.is_finished())
    }

    pub fn period(&self) -> Option<Duration> {
        self.worker.as_ref().and_then(|w| *w.period.borrow())
    }

    /// Cancel the worker, including a cycle in flight.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.handle.abort();
        }
    }

    /// The live worker, spawned on first use or after it exited.
    fn worker(&mut self) -> &Worker {
        if self.worker.as_ref().is_some_and(|w| w.handle.is_finished()) {
            self.worker = None;
        }
        self.worker
            .get_or_insert_with(|| spawn_worker(self.engine.clone(), self.events.clone()))
    }
}

fn spawn_worker(engine: Arc<RefreshEngine>, events: UnboundedSender<AppEvent>) -> Worker {
    let (trigger, triggers) = mpsc::channel(1);
    let (period, periods) = watch::channel(None);
    let handle = tokio::spawn(run_worker(engine, periods, triggers, events));
    Worker {
        handle,
        trigger,
        period,
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker(
    engine: Arc<RefreshEngine>,
    mut periods: watch::Receiver<Option<Duration>>,
    mut triggers: mpsc::Receiver<()>,
    events: UnboundedSender<AppEvent>,
) {
    let mut ticker = ticker_for(*periods.borrow_and_update());

    loop {
        tokio::select! {
            changed = periods.changed() => {
                if changed.is_err() {
                    break;
                }
                // a new period ticks immediately
                ticker = ticker_for(*periods.borrow_and_update());
                continue;
            }
            _ = next_tick(&mut ticker) => {}
            msg = triggers.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }

        if events.send(AppEvent::RefreshStarted).is_err() {
            break;
        }
        let outcome = engine.refresh().await;
        if events.send(AppEvent::Refreshed(outcome)).is_err() {
            break;
        }
    }
    log::debug!("refresh worker exiting");
}

fn ticker_for(period: Option<Duration>) -> Option<Interval> {
    period.map(|p| {
        let mut ticker = interval(p);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    })
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::DirEntry;
    use crate::snapshot::ViewerMode;
    use async_trait::async_trait;

    struct Empty;

    #[async_trait]
    impl FileSystemProvider for Empty {
        async fn list_entries(&self) -> Result<Vec<DirEntry>, ProviderError> {
            Ok(Vec::new())
        }
        async fn read_text(&self, entry: &DirEntry) -> Result<String, ProviderError> {
            Err(ProviderError::Read {
                name: entry.name.clone(),
                reason: "empty".into(),
            })
        }
    }

    #[test]
    fn test_node_count_change_is_noted_once() {
        let engine = RefreshEngine::new(Arc::new(Empty), SnapshotBuilder::for_mode(ViewerMode::Rich));
        assert!(engine.note_node_count(2));
        assert!(!engine.note_node_count(2));
        assert!(engine.note_node_count(3));
        assert!(engine.note_node_count(0));
        assert!(!engine.note_node_count(0));
    }

    #[tokio::test]
    async fn test_no_data_counts_as_zero_nodes() {
        let engine = RefreshEngine::new(Arc::new(Empty), SnapshotBuilder::for_mode(ViewerMode::Rich));
        assert!(matches!(engine.refresh().await, RefreshOutcome::NoData { .. }));
        assert!(!engine.note_node_count(0));
    }
}
