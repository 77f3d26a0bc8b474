//! Background sync scheduler.
//!
//! Runs independently of any foreground fetch: a fixed wall-clock interval
//! drives a poll of the single latest reading, which is forwarded to the
//! status sink and evaluated against the thresholds, delivering any alerts.
//!
//! Each schedule is identified by a caller-chosen identity. Registering
//! again under the same identity replaces the pending schedule instead of
//! creating a duplicate; different identities coexist independently.
//!
//! Schedules live only as long as the process. A supervised hosting process
//! re-registers its identities at startup; replace-on-register makes that
//! idempotent, so boot-time registration needs no existence check.
//!
//! # Failure policy
//!
//! A failed tick never retries immediately and never backs off: the next
//! scheduled tick is the only retry mechanism. Retryable failures (network,
//! server) are logged at warn; unrecoverable ones (a malformed row) at
//! error. The schedule task itself never stops on failure and never panics.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use airsync_core::{Config, StoreClient, SyncScheduler, Thresholds};
//! use airsync_core::sink::{LogAlertSink, LogStatusSink};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let client = Arc::new(StoreClient::new(&config)?);
//! let scheduler = SyncScheduler::new(
//!     client,
//!     Thresholds::default(),
//!     Arc::new(LogAlertSink),
//!     Arc::new(LogStatusSink),
//! );
//! scheduler.schedule("sensor-sync", Duration::from_secs(5 * 60));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use airsync_types::Reading;

use crate::client::ReadingStore;
use crate::sink::{AlertSink, SinkError, StatusSink};
use crate::thresholds::Thresholds;

/// Periodic background sync over a shared store.
pub struct SyncScheduler<S> {
    store: Arc<S>,
    thresholds: Thresholds,
    alert_sink: Arc<dyn AlertSink>,
    status_sink: Arc<dyn StatusSink>,
    schedules: Mutex<HashMap<String, CancellationToken>>,
}

impl<S: ReadingStore + 'static> SyncScheduler<S> {
    /// Create a scheduler with no active schedules.
    pub fn new(
        store: Arc<S>,
        thresholds: Thresholds,
        alert_sink: Arc<dyn AlertSink>,
        status_sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            store,
            thresholds,
            alert_sink,
            status_sink,
            schedules: Mutex::new(HashMap::new()),
        }
    }

    /// Register (or replace) a periodic sync under `identity`.
    ///
    /// Idempotent per identity: an existing schedule with the same identity
    /// is cancelled and replaced, never duplicated. The first poll fires
    /// immediately, then on the fixed interval.
    pub fn schedule(&self, identity: impl Into<String>, period: Duration) {
        let identity = identity.into();
        // A zero period would panic tokio's interval inside the spawned
        // task, silently killing the schedule while it still counts as
        // active.
        let period = if period.is_zero() {
            warn!(identity, "zero schedule period clamped to 1s");
            Duration::from_secs(1)
        } else {
            period
        };
        let cancel = CancellationToken::new();

        {
            let mut schedules = self.schedules.lock().expect("scheduler lock poisoned");
            if let Some(previous) = schedules.insert(identity.clone(), cancel.clone()) {
                debug!(identity, "replacing existing schedule");
                previous.cancel();
            }
        }

        info!(identity, period_secs = period.as_secs(), "schedule registered");

        let store = Arc::clone(&self.store);
        let thresholds = self.thresholds.clone();
        let alert_sink = Arc::clone(&self.alert_sink);
        let status_sink = Arc::clone(&self.status_sink);
        tokio::spawn(async move {
            run_schedule(identity, period, store, thresholds, alert_sink, status_sink, cancel)
                .await;
        });
    }

    /// Cancel the schedule registered under `identity`.
    ///
    /// Returns whether a schedule was active.
    pub fn cancel(&self, identity: &str) -> bool {
        let removed = self
            .schedules
            .lock()
            .expect("scheduler lock poisoned")
            .remove(identity);
        match removed {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of active schedules.
    pub fn active_count(&self) -> usize {
        self.schedules.lock().expect("scheduler lock poisoned").len()
    }

    /// Cancel every schedule.
    pub fn shutdown(&self) {
        let mut schedules = self.schedules.lock().expect("scheduler lock poisoned");
        for (identity, token) in schedules.drain() {
            debug!(identity, "cancelling schedule");
            token.cancel();
        }
    }
}

impl<S> Drop for SyncScheduler<S> {
    fn drop(&mut self) {
        if let Ok(mut schedules) = self.schedules.lock() {
            for token in schedules.values() {
                token.cancel();
            }
            schedules.clear();
        }
    }
}

async fn run_schedule<S: ReadingStore>(
    identity: String,
    period: Duration,
    store: Arc<S>,
    thresholds: Thresholds,
    alert_sink: Arc<dyn AlertSink>,
    status_sink: Arc<dyn StatusSink>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(identity, "schedule stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        run_tick(&identity, &*store, &thresholds, &*alert_sink, &*status_sink).await;
    }
}

/// One Scheduled → Running → Idle pass. Absorbs every failure.
async fn run_tick<S: ReadingStore>(
    identity: &str,
    store: &S,
    thresholds: &Thresholds,
    alert_sink: &dyn AlertSink,
    status_sink: &dyn StatusSink,
) {
    match store.query_latest().await {
        Ok(Some(row)) => match Reading::try_from(&row) {
            Ok(reading) => {
                status_sink.display(&reading).await;

                for alert in thresholds.evaluate(&reading) {
                    match alert_sink.deliver(&alert).await {
                        Ok(()) => {
                            debug!(identity, metric = %alert.metric, "alert delivered");
                        }
                        Err(SinkError::Disallowed) => {
                            // The evaluator still ran; the alert is logged
                            // here instead of delivered.
                            info!(
                                identity,
                                metric = %alert.metric,
                                message = %alert.message,
                                "alert delivery disallowed"
                            );
                        }
                        Err(e) => {
                            warn!(identity, metric = %alert.metric, error = %e, "alert delivery failed");
                        }
                    }
                }
            }
            Err(e) => {
                error!(identity, error = %e, "latest reading unparsable; waiting for next tick");
            }
        },
        Ok(None) => {
            debug!(identity, "store is empty; nothing to sync");
        }
        Err(e) if e.is_retryable() => {
            warn!(identity, error = %e, "sync failed; next tick is the retry");
        }
        Err(e) => {
            error!(identity, error = %e, "sync failed with non-retryable error");
        }
    }
}
