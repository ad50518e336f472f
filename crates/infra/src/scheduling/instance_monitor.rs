//! Gateway connection-state monitor.
//!
//! Sweeps every stored messaging instance through the gateway and persists
//! status transitions. The cadence adapts to what the last sweep saw: while
//! any instance is still pairing the monitor polls every few seconds so a
//! freshly scanned QR code is picked up quickly, and once every instance
//! reports connected it backs off to a slower steady-state interval.

use std::sync::Arc;
use std::time::Duration;

use agendapro_core::InstanceService;
use agendapro_domain::constants::{
    DEFAULT_MONITOR_CONNECTED_POLL_SECS, DEFAULT_MONITOR_PENDING_POLL_SECS,
};
use agendapro_domain::{InstanceStatus, MessagingInstance, WorkerConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the instance status monitor.
#[derive(Debug, Clone)]
pub struct InstanceMonitorConfig {
    /// Poll interval while at least one instance is still pairing
    pub pending_poll: Duration,
    /// Poll interval once every instance reports connected
    pub connected_poll: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for InstanceMonitorConfig {
    fn default() -> Self {
        Self {
            pending_poll: Duration::from_secs(DEFAULT_MONITOR_PENDING_POLL_SECS),
            connected_poll: Duration::from_secs(DEFAULT_MONITOR_CONNECTED_POLL_SECS),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl InstanceMonitorConfig {
    /// Build the monitor configuration from the worker section of the
    /// application config.
    pub fn from_worker_config(config: &WorkerConfig) -> Self {
        Self {
            pending_poll: Duration::from_secs(config.monitor_pending_poll_seconds),
            connected_poll: Duration::from_secs(config.monitor_connected_poll_seconds),
            ..Default::default()
        }
    }
}

/// Instance status monitor with explicit lifecycle management.
pub struct InstanceMonitor {
    instances: Arc<InstanceService>,
    config: InstanceMonitorConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl InstanceMonitor {
    /// Create a new monitor with the given configuration.
    pub fn new(instances: Arc<InstanceService>, config: InstanceMonitorConfig) -> Self {
        Self { instances, config, cancellation: CancellationToken::new(), task_handle: None }
    }

    /// Start the monitor, spawning the background polling task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!("Starting instance monitor");

        // Create fresh cancellation token
        self.cancellation = CancellationToken::new();

        let instances = Arc::clone(&self.instances);
        let config = self.config.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::poll_loop(instances, config, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("Instance monitor started");
        Ok(())
    }

    /// Stop the monitor and wait for the polling task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping instance monitor");

        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Instance monitor stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when the polling task is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Background polling loop.
    async fn poll_loop(
        instances: Arc<InstanceService>,
        config: InstanceMonitorConfig,
        cancel: CancellationToken,
    ) {
        let mut interval = config.pending_poll;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Instance monitor poll loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    interval = match instances.poll_all().await {
                        Ok(polled) => Self::next_interval(&config, &polled),
                        Err(error) => {
                            warn!(%error, "Instance status sweep failed");
                            config.pending_poll
                        }
                    };
                }
            }
        }
    }

    /// Pick the next poll interval from what the sweep saw. An empty sweep
    /// backs off too: nothing is pairing, so there is no QR code to chase.
    fn next_interval(config: &InstanceMonitorConfig, polled: &[MessagingInstance]) -> Duration {
        let all_connected =
            polled.iter().all(|instance| instance.status == InstanceStatus::Connected);

        if all_connected {
            config.connected_poll
        } else {
            config.pending_poll
        }
    }
}

impl Drop for InstanceMonitor {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("InstanceMonitor dropped while running; cancelling poll task");
            self.cancellation.cancel();
        }
    }
}
