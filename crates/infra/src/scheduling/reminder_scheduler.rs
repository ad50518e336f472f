//! Cron-driven reminder dispatch.
//!
//! On every tick the scheduler scans for appointments whose slot begins
//! inside one of the reminder windows (24 hours out and 1 hour out) and
//! hands each hit to the notification service. The per-kind sent flag
//! makes the dispatch idempotent, so overlapping ticks and restarts are
//! harmless: a reminder that was already sent is skipped downstream.

use std::sync::Arc;
use std::time::Duration;

use agendapro_core::{AppointmentRepository, NotificationService};
use agendapro_domain::constants::{DEFAULT_REMINDER_CRON, REMINDER_WINDOW_MINUTES};
use agendapro_domain::{AgendaError, Appointment, AppointmentStatus, MessageKind, WorkerConfig};
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the reminder scheduler.
#[derive(Debug, Clone)]
pub struct ReminderSchedulerConfig {
    /// Cron expression describing the scan schedule.
    pub cron_expression: String,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for ReminderSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_REMINDER_CRON.to_string(),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl ReminderSchedulerConfig {
    /// Build the scheduler configuration from the worker section of the
    /// application config.
    pub fn from_worker_config(config: &WorkerConfig) -> Self {
        Self { cron_expression: config.reminder_cron.clone(), ..Default::default() }
    }
}

/// Reminder scheduler with explicit lifecycle management.
pub struct ReminderScheduler {
    scheduler: Option<JobScheduler>,
    config: ReminderSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    appointments: Arc<dyn AppointmentRepository>,
    notifications: Arc<NotificationService>,
}

impl ReminderScheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(
        cron_expression: String,
        appointments: Arc<dyn AppointmentRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        let config = ReminderSchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, appointments, notifications)
    }

    /// Create a scheduler with a custom configuration.
    pub fn with_config(
        config: ReminderSchedulerConfig,
        appointments: Arc<dyn AppointmentRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            appointments,
            notifications,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        let start_result = tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?;

        start_result.map_err(|err| SchedulerError::StartFailed(err.to_string()))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_task(cancel).await;
        });

        self.monitor_handle = Some(handle);
        info!("Reminder scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        let stop_result =
            tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?;

        stop_result.map_err(|err| SchedulerError::StopFailed(err.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Reminder scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|err| SchedulerError::CreationFailed(err.to_string()))?;

        let cron_expr = self.config.cron_expression.clone();
        let appointments = Arc::clone(&self.appointments);
        let notifications = Arc::clone(&self.notifications);

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let appointments = Arc::clone(&appointments);
            let notifications = Arc::clone(&notifications);

            Box::pin(async move {
                Self::dispatch_due_reminders(appointments, notifications).await;
            })
        })
        .map_err(|err| SchedulerError::JobRegistrationFailed(err.to_string()))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|err| SchedulerError::JobRegistrationFailed(err.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered reminder scan job");
        Ok(scheduler)
    }

    /// One scan tick: collect due appointments and dispatch each reminder.
    async fn dispatch_due_reminders(
        appointments: Arc<dyn AppointmentRepository>,
        notifications: Arc<NotificationService>,
    ) {
        // Slot times are stored as wall-clock values, so the scan anchors
        // on the host's local time rather than UTC.
        let now = Local::now().naive_local();
        let due = Self::collect_due(&appointments, now).await;

        if due.is_empty() {
            debug!("No reminders due");
            return;
        }

        let mut dispatched = 0_u32;
        let mut skipped = 0_u32;
        let mut errors = 0_u32;

        for (appointment, kind) in due {
            match notifications.send_notification(appointment.tenant_id, appointment.id, kind).await
            {
                Ok(()) => {
                    dispatched = dispatched.saturating_add(1);
                    debug!(appointment_id = %appointment.id, kind = %kind, "Reminder dispatched");
                }
                Err(AgendaError::AlreadySent(_)) => {
                    // An earlier tick got there first.
                    skipped = skipped.saturating_add(1);
                }
                Err(error) => {
                    errors = errors.saturating_add(1);
                    warn!(
                        appointment_id = %appointment.id,
                        kind = %kind,
                        %error,
                        "Reminder dispatch failed"
                    );
                }
            }
        }

        info!(dispatched, skipped, errors, "Reminder scan completed");
    }

    /// Appointments whose slot begins inside one of the reminder windows,
    /// paired with the kind that window serves. Cancelled appointments are
    /// dropped here; duplicate dispatch is caught downstream by the
    /// per-kind sent flag.
    async fn collect_due(
        appointments: &Arc<dyn AppointmentRepository>,
        now: NaiveDateTime,
    ) -> Vec<(Appointment, MessageKind)> {
        let offsets = [
            (ChronoDuration::hours(24), MessageKind::Reminder24h),
            (ChronoDuration::hours(1), MessageKind::Reminder1h),
        ];

        let mut due = Vec::new();

        for (lead, kind) in offsets {
            let from = now + lead;
            let to = from + ChronoDuration::minutes(REMINDER_WINDOW_MINUTES);

            match appointments.find_in_slot_window(from, to).await {
                Ok(batch) => {
                    for appointment in batch {
                        if appointment.status == AppointmentStatus::Cancelled {
                            continue;
                        }
                        due.push((appointment, kind));
                    }
                }
                Err(error) => {
                    warn!(kind = %kind, %error, "Reminder window scan failed");
                }
            }
        }

        due
    }

    async fn monitor_task(cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Reminder scheduler monitor cancelled");
            }
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ReminderScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
