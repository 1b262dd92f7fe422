//! Periodic replacement of the record store from a [`RecordSource`].
//!
//! Each tick waits out a simulated fetch delay, pulls a fresh batch and swaps
//! it into the store. A batch is dropped if the task was cancelled meanwhile
//! or if something else replaced the store since the tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opsboard_core::RecordStore;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::RecordSource;

const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    pub interval: Duration,
    /// Pause between a tick and the fetch, standing in for network latency.
    pub fetch_delay: Duration,
}

impl RefreshConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            fetch_delay: DEFAULT_FETCH_DELAY,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::every(Duration::from_secs(30))
    }
}

/// Handle to a running refresh task. Dropping it cancels the task.
pub struct RefreshHandle {
    cancelled: Arc<AtomicBool>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Spawn the refresh loop on the current tokio runtime.
    pub fn spawn(
        store: RecordStore,
        source: Arc<dyn RecordSource>,
        config: RefreshConfig,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tracing::info!(
            interval_ms = config.interval.as_millis() as u64,
            "auto-refresh started"
        );
        let task = tokio::spawn(refresh_loop(
            store,
            source,
            config,
            Arc::clone(&cancelled),
            shutdown_rx,
        ));

        Self {
            cancelled,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Stop future firings. An in-flight batch that has not been applied yet
    /// is discarded.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!("auto-refresh task ended abnormally: {err}");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn refresh_loop(
    store: RecordStore,
    source: Arc<dyn RecordSource>,
    config: RefreshConfig,
    cancelled: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let period = config.interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {}
        }

        let seen = store.generation();
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = tokio::time::sleep(config.fetch_delay) => {}
        }

        if !fetch_and_apply(&store, source.as_ref(), seen, &cancelled) {
            break;
        }
    }

    tracing::info!("auto-refresh stopped");
}

/// Pull one batch and swap it in unless the handle was cancelled, before or
/// during the fetch, or the store moved past `seen`. Returns `false` once
/// cancellation is observed.
fn fetch_and_apply(
    store: &RecordStore,
    source: &dyn RecordSource,
    seen: u64,
    cancelled: &AtomicBool,
) -> bool {
    if cancelled.load(Ordering::SeqCst) {
        return false;
    }

    let batch = source.fetch();
    if cancelled.load(Ordering::SeqCst) {
        tracing::info!(
            episodes = batch.len(),
            "auto-refresh cancelled during fetch, dropping batch"
        );
        return false;
    }

    match store.replace_if_current(seen, batch) {
        Some(snapshot) => tracing::info!(
            generation = snapshot.generation,
            episodes = snapshot.episodes.len(),
            "auto-refresh replaced working set"
        ),
        None => tracing::warn!(
            seen,
            current = store.generation(),
            "store changed during refresh, dropping stale batch"
        ),
    }
    true
}

/// Owns the refresh task for one store and restarts it when the interval
/// changes.
pub struct AutoRefresh {
    store: RecordStore,
    source: Arc<dyn RecordSource>,
    fetch_delay: Duration,
    running: Option<RefreshHandle>,
}

impl AutoRefresh {
    pub fn new(store: RecordStore, source: Arc<dyn RecordSource>) -> Self {
        Self {
            store,
            source,
            fetch_delay: DEFAULT_FETCH_DELAY,
            running: None,
        }
    }

    pub fn with_fetch_delay(mut self, fetch_delay: Duration) -> Self {
        self.fetch_delay = fetch_delay;
        self
    }

    /// `None` or a zero interval turns refreshing off. Any running task is
    /// cancelled before a new one starts.
    pub fn set_interval(&mut self, interval: Option<Duration>) {
        if let Some(mut previous) = self.running.take() {
            previous.cancel();
        }

        let Some(interval) = interval.filter(|interval| !interval.is_zero()) else {
            tracing::info!("auto-refresh off");
            return;
        };

        self.running = Some(RefreshHandle::spawn(
            self.store.clone(),
            Arc::clone(&self.source),
            RefreshConfig {
                interval,
                fetch_delay: self.fetch_delay,
            },
        ));
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Cancel and wait for the running task, if any.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.running.take() {
            handle.shutdown().await;
        }
    }
}
