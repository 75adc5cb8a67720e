use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::alerts::{Alert, AlertEngine, AlertThresholds, RefreshOutcome};
use crate::datasource::{fetch_snapshot, DataSource};
use crate::errors::ServiceError;
use crate::notifications::Notifier;

/// Owns the alert engine: refreshes it from the data source and hands new
/// or escalated alerts to the notifier.
pub struct AlertService {
    source: Arc<dyn DataSource>,
    engine: RwLock<AlertEngine>,
    notifier: Arc<dyn Notifier>,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
}

impl AlertService {
    pub fn new(
        source: Arc<dyn DataSource>,
        thresholds: AlertThresholds,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            engine: RwLock::new(AlertEngine::new(thresholds)),
            notifier,
            last_refreshed: RwLock::new(None),
        }
    }

    /// Fetches a snapshot and reconciles the active set with it.
    ///
    /// On a fetch failure the current alerts stay as they were.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome, ServiceError> {
        let snapshot = match fetch_snapshot(self.source.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "alert refresh failed; keeping previous alerts");
                return Err(err);
            }
        };

        let outcome = {
            let mut engine = self.engine.write().await;
            engine.refresh(&snapshot)
        };
        *self.last_refreshed.write().await = Some(snapshot.as_of);

        let to_notify = outcome.to_notify();
        if !to_notify.is_empty() {
            self.notifier.notify(&to_notify).await;
        }

        if outcome.is_quiet() {
            debug!("alert refresh: no changes");
        } else {
            info!(
                raised = outcome.raised.len(),
                escalated = outcome.escalated.len(),
                resolved = outcome.resolved.len(),
                "alert refresh"
            );
        }
        Ok(outcome)
    }

    pub async fn active(&self) -> Vec<Alert> {
        self.engine.read().await.active()
    }

    pub async fn all(&self) -> Vec<Alert> {
        self.engine.read().await.all()
    }

    pub async fn dismiss(&self, id: &str) -> Result<Alert, ServiceError> {
        self.engine.write().await.dismiss(id)
    }

    pub async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed.read().await
    }

    /// Refreshes every `interval` until `shutdown` flips to `true`.
    ///
    /// The first tick lands one interval out; callers refresh once at startup.
    pub fn spawn_poller(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "alert poller started");
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Errors are already logged by refresh
                        let _ = self.refresh().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("alert poller stopped");
        })
    }
}
