//! Periodic threshold checks and event notifications.
//!
//! ## Flow
//!
//! ```text
//! sleep(check_interval) → collect snapshot → evaluate cpu / memory / disk → send alert(s)
//!     ↑
//!     └─── stop() or shutdown signal ends the loop between checks
//! ```
//!
//! Configuration and alert state share one lock. It is never held across a
//! snapshot collection or an outbound request; state changes caused by a
//! delivery are applied after the request has completed.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use tokio::{
    sync::{Mutex, RwLock, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, trace};

use crate::{
    Metric, SystemInfo,
    config::TelegramConfig,
    monitors::{resources::ResourceEvaluation, system::SnapshotProvider},
};

use super::{
    FilterUpdate,
    compose::{compose_alert_message, compose_filter_update_message},
    state::{AlertState, AlertStates},
    telegram::{DeliveryError, TelegramClient},
};

/// Sent by [`NotificationManager::send_test`] when no message is given.
pub const DEFAULT_TEST_MESSAGE: &str = "Hostwatch test notification";

struct SharedState {
    config: TelegramConfig,
    alerts: AlertStates,
}

struct Inner {
    shared: RwLock<SharedState>,
    client: TelegramClient,
    provider: Arc<dyn SnapshotProvider>,
}

struct Worker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the Telegram configuration, the per-metric alert state and the
/// background check loop.
pub struct NotificationManager {
    inner: Arc<Inner>,
    worker: Mutex<Option<Worker>>,
}

impl NotificationManager {
    pub fn new(config: TelegramConfig, provider: Arc<dyn SnapshotProvider>) -> Self {
        Self::with_client(config, provider, TelegramClient::new())
    }

    pub fn with_client(
        config: TelegramConfig,
        provider: Arc<dyn SnapshotProvider>,
        client: TelegramClient,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared: RwLock::new(SharedState {
                    config: config.normalize(),
                    alerts: AlertStates::default(),
                }),
                client,
                provider,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Spawns the check loop. Calling it again while a loop is registered does
    /// nothing.
    ///
    /// The loop also ends once `shutdown` turns `true` or its sender is
    /// dropped.
    pub async fn start(&self, shutdown: watch::Receiver<bool>) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            trace!("notification loop already running");
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(self.inner.clone(), stop_rx, shutdown));

        *worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
    }

    /// Signals the loop to stop and waits until it has exited. A check that
    /// is already running completes first. A concurrent `start` waits until
    /// the old loop is gone.
    pub async fn stop(&self) {
        let mut slot = self.worker.lock().await;
        let Some(worker) = slot.take() else {
            return;
        };

        // the loop may already be gone after an external shutdown
        let _ = worker.stop.send(());

        if let Err(e) = worker.handle.await {
            error!("notification loop terminated abnormally: {e}");
        }
    }

    /// Whether a loop is registered and has not exited yet.
    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Replaces the configuration. Disabling notifications drops every active
    /// alert; last delivery times are kept.
    pub async fn update_config(&self, config: TelegramConfig) {
        let config = config.normalize();
        let mut shared = self.inner.shared.write().await;

        if !config.enabled {
            shared.alerts.clear_all();
        }

        info!(
            enabled = config.enabled,
            check_interval_ms = config.check_interval.as_millis() as u64,
            "telegram configuration updated"
        );
        shared.config = config;
    }

    pub async fn config(&self) -> TelegramConfig {
        self.inner.config().await
    }

    pub async fn alert_states(&self) -> BTreeMap<Metric, AlertState> {
        self.inner.shared.read().await.alerts.snapshot()
    }

    /// Sends a test message with the current credentials. Notifications do
    /// not have to be enabled.
    #[instrument(skip_all)]
    pub async fn send_test(&self, message: &str) -> Result<(), DeliveryError> {
        let config = self.inner.config().await;
        if !config.has_credentials() {
            return Err(DeliveryError::IncompleteConfig);
        }

        let message = match message.trim() {
            "" => DEFAULT_TEST_MESSAGE,
            message => message,
        };

        self.inner.client.send(&config, message).await
    }

    /// Reports a filter list refresh. Failures are logged, never returned.
    #[instrument(skip_all, fields(name = %update.name, list_type = ?update.list_type))]
    pub async fn notify_filter_update(&self, update: FilterUpdate) {
        let config = self.inner.config().await;
        if !config.is_deliverable() {
            trace!("notifications disabled, dropping filter update");
            return;
        }

        let info = self.inner.provider.collect().await;
        let message = compose_filter_update_message(&config, &update, &info);
        if message.trim().is_empty() {
            return;
        }

        match self.inner.client.send(&config, &message).await {
            Ok(()) => debug!("filter update notification delivered"),
            Err(e) => error!("telegram filter update notification failed: {e}"),
        }
    }

    /// Runs a single check outside of the loop schedule.
    pub async fn run_check(&self) {
        self.inner.run_check().await;
    }
}

impl Inner {
    async fn config(&self) -> TelegramConfig {
        self.shared.read().await.config.clone()
    }

    #[instrument(skip_all)]
    async fn run_check(&self) {
        let config = self.config().await;
        if !config.is_deliverable() {
            trace!("notifications disabled or incomplete, skipping check");
            return;
        }

        let info = self.provider.collect().await;
        for metric in Metric::ALL {
            self.handle_metric(&config, metric, &info).await;
        }
    }

    async fn handle_metric(&self, config: &TelegramConfig, metric: Metric, info: &SystemInfo) {
        let value = metric.value(info);
        let threshold = config.threshold(metric);
        let state = self.shared.read().await.alerts.get(metric);

        let evaluation = ResourceEvaluation::evaluate(
            value,
            threshold,
            state.active,
            state.since_last_alert(Utc::now()),
            config.cooldown,
        );

        trace!("{metric} evaluation: {value:.1}% vs {threshold}%, active {} → {evaluation:?}", state.active);

        if evaluation.clears_state() {
            if state.active {
                debug!("{metric}: alert cleared ({value:.1}%)");
            }
            self.shared.write().await.alerts.clear(metric);
            return;
        }

        if evaluation != ResourceEvaluation::StartsToExceed {
            return;
        }

        let message = compose_alert_message(config, metric, value, threshold, info);
        let attempted_at = Utc::now();

        match self.client.send(config, &message).await {
            Ok(()) => {
                info!("{metric}: alert delivered ({value:.1}% >= {threshold}%)");
                let mut shared = self.shared.write().await;
                // notifications may have been switched off during the request
                if shared.config.enabled {
                    shared.alerts.mark_active(metric, attempted_at);
                }
            }
            Err(e) => error!("{metric}: telegram alert failed: {e}"),
        }
    }
}

async fn run_loop(
    inner: Arc<Inner>,
    mut stop: oneshot::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("starting notification loop");

    loop {
        let interval = inner.config().await.check_interval;

        tokio::select! {
            _ = &mut stop => {
                debug!("received stop signal");
                break;
            }

            _ = shutdown_requested(&mut shutdown) => {
                debug!("received shutdown signal");
                break;
            }

            _ = tokio::time::sleep(interval) => {
                inner.run_check().await;
            }
        }
    }

    debug!("notification loop stopped");
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // an error means the sender is gone, which counts as shutdown as well
    let _ = shutdown.wait_for(|requested| *requested).await;
}
