//! Application context - dependency injection and worker lifecycle.
//!
//! `AppContext::new_with_config` wires every port to its adapter, builds
//! the services on top, and starts the three background workers before
//! handing the frozen context to the router. Startup is fail-fast: a
//! worker that cannot start aborts the boot instead of leaving the
//! process half-alive.

use std::sync::Arc;
use std::time::Duration;

use agendapro_core::{
    AdminService, AppointmentRepository, AuditLogRepository, BookingService, CalendarAuth,
    CalendarProvider, CalendarSyncService, ClientRepository, InstanceRepository, InstanceService,
    MessageGateway, NotificationService, OutboxQueue, ServiceCatalogRepository, SyncJobHandler,
    TemplateRepository, TokenRepository, UserDirectory,
};
use agendapro_domain::{AgendaError, AppConfig, Result};
use agendapro_infra::{
    DbManager, EvolutionGateway, GoogleCalendarAuth, GoogleCalendarClient, GoogleOAuthFlow,
    InstanceMonitor, InstanceMonitorConfig, OutboxWorker, OutboxWorkerConfig, ReminderScheduler,
    ReminderSchedulerConfig, SqliteAppointmentRepository, SqliteAuditLogRepository,
    SqliteClientRepository, SqliteInstanceRepository, SqliteOutboxRepository,
    SqliteServiceRepository, SqliteTemplateRepository, SqliteTokenRepository, SqliteUserDirectory,
};
use tracing::{error, info};

const WORKER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state handed to every request handler.
pub struct AppContext {
    pub config: AppConfig,
    pub db: Arc<DbManager>,

    // Ports the handlers use directly
    pub clients: Arc<dyn ClientRepository>,
    pub catalog: Arc<dyn ServiceCatalogRepository>,
    pub outbox: Arc<dyn OutboxQueue>,
    pub tokens: Arc<dyn TokenRepository>,

    // Services
    pub booking: Arc<BookingService>,
    pub notifications: Arc<NotificationService>,
    pub instances: Arc<InstanceService>,
    pub calendar_sync: Arc<CalendarSyncService>,
    pub admin: Arc<AdminService>,
    pub oauth_flow: Arc<GoogleOAuthFlow>,

    // Background workers, stopped through Drop cancellation
    pub outbox_worker: Arc<OutboxWorker>,
    pub instance_monitor: Arc<InstanceMonitor>,
    pub reminder_scheduler: Arc<ReminderScheduler>,
}

impl AppContext {
    /// Build the full dependency graph from the given configuration,
    /// run pending migrations, and start the background workers.
    pub async fn new_with_config(config: AppConfig) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        // Persistence adapters
        let appointments: Arc<dyn AppointmentRepository> =
            Arc::new(SqliteAppointmentRepository::new(db.clone()));
        let clients: Arc<dyn ClientRepository> = Arc::new(SqliteClientRepository::new(db.clone()));
        let catalog: Arc<dyn ServiceCatalogRepository> =
            Arc::new(SqliteServiceRepository::new(db.clone()));
        let outbox: Arc<dyn OutboxQueue> = Arc::new(SqliteOutboxRepository::new(db.clone()));
        let templates: Arc<dyn TemplateRepository> =
            Arc::new(SqliteTemplateRepository::new(db.clone()));
        let instance_rows: Arc<dyn InstanceRepository> =
            Arc::new(SqliteInstanceRepository::new(db.clone()));
        let tokens: Arc<dyn TokenRepository> = Arc::new(SqliteTokenRepository::new(db.clone()));
        let users: Arc<dyn UserDirectory> = Arc::new(SqliteUserDirectory::new(db.clone()));
        let audit: Arc<dyn AuditLogRepository> = Arc::new(SqliteAuditLogRepository::new(db.clone()));

        // Outbound adapters
        let gateway: Arc<dyn MessageGateway> = Arc::new(EvolutionGateway::new(&config.messaging)?);
        let provider: Arc<dyn CalendarProvider> =
            Arc::new(GoogleCalendarClient::new(&config.calendar)?);
        let auth: Arc<dyn CalendarAuth> = Arc::new(GoogleCalendarAuth::new(&config.calendar)?);
        let oauth_flow = Arc::new(GoogleOAuthFlow::new(&config.calendar)?);

        // Services
        let booking = Arc::new(BookingService::new(
            appointments.clone(),
            clients.clone(),
            catalog.clone(),
            outbox.clone(),
        ));
        let notifications = Arc::new(NotificationService::new(
            appointments.clone(),
            clients.clone(),
            templates,
            instance_rows.clone(),
            gateway.clone(),
        ));
        let instances = Arc::new(InstanceService::new(instance_rows, gateway));
        let calendar_sync = Arc::new(CalendarSyncService::new(
            tokens.clone(),
            auth,
            provider,
            appointments.clone(),
            clients.clone(),
        ));
        let admin = Arc::new(AdminService::new(users, audit));

        // Background workers
        let sync_handler: Arc<dyn SyncJobHandler> = calendar_sync.clone();
        let outbox_worker = start_outbox_worker(
            outbox.clone(),
            sync_handler,
            OutboxWorkerConfig::from_worker_config(&config.workers),
        )
        .await?;
        let instance_monitor = start_instance_monitor(
            instances.clone(),
            InstanceMonitorConfig::from_worker_config(&config.workers),
        )
        .await?;
        let reminder_scheduler = start_reminder_scheduler(
            appointments,
            notifications.clone(),
            ReminderSchedulerConfig::from_worker_config(&config.workers),
        )
        .await?;

        info!("application context initialized");

        Ok(Self {
            config,
            db,
            clients,
            catalog,
            outbox,
            tokens,
            booking,
            notifications,
            instances,
            calendar_sync,
            admin,
            oauth_flow,
            outbox_worker,
            instance_monitor,
            reminder_scheduler,
        })
    }

    /// Database reachability probe backing the health endpoint.
    pub async fn health_check(&self) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.health_check())
            .await
            .map_err(|err| AgendaError::Internal(format!("health check task failed: {err}")))?
    }

    /// Release the context.
    ///
    /// The workers cancel their tasks from `Drop`, so dropping the last
    /// `Arc` of this context stops them; there is no explicit teardown
    /// beyond logging the intent.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutting down application context");
        Ok(())
    }
}

async fn start_outbox_worker(
    outbox: Arc<dyn OutboxQueue>,
    handler: Arc<dyn SyncJobHandler>,
    config: OutboxWorkerConfig,
) -> Result<Arc<OutboxWorker>> {
    let mut worker = OutboxWorker::new(outbox, handler, config);
    tokio::time::timeout(WORKER_START_TIMEOUT, worker.start())
        .await
        .map_err(|_| {
            error!("outbox worker start timed out");
            AgendaError::Internal("outbox worker start timed out".to_string())
        })?
        .map_err(|err| {
            error!(error = %err, "failed to start outbox worker");
            AgendaError::Internal(format!("failed to start outbox worker: {err}"))
        })?;
    Ok(Arc::new(worker))
}

async fn start_instance_monitor(
    instances: Arc<InstanceService>,
    config: InstanceMonitorConfig,
) -> Result<Arc<InstanceMonitor>> {
    let mut monitor = InstanceMonitor::new(instances, config);
    tokio::time::timeout(WORKER_START_TIMEOUT, monitor.start())
        .await
        .map_err(|_| {
            error!("instance monitor start timed out");
            AgendaError::Internal("instance monitor start timed out".to_string())
        })?
        .map_err(|err| {
            error!(error = %err, "failed to start instance monitor");
            AgendaError::Internal(format!("failed to start instance monitor: {err}"))
        })?;
    Ok(Arc::new(monitor))
}

async fn start_reminder_scheduler(
    appointments: Arc<dyn AppointmentRepository>,
    notifications: Arc<NotificationService>,
    config: ReminderSchedulerConfig,
) -> Result<Arc<ReminderScheduler>> {
    let mut scheduler = ReminderScheduler::with_config(config, appointments, notifications);
    tokio::time::timeout(WORKER_START_TIMEOUT, scheduler.start())
        .await
        .map_err(|_| {
            error!("reminder scheduler start timed out");
            AgendaError::Internal("reminder scheduler start timed out".to_string())
        })?
        .map_err(|err| {
            error!(error = %err, "failed to start reminder scheduler");
            AgendaError::Internal(format!("failed to start reminder scheduler: {err}"))
        })?;
    Ok(Arc::new(scheduler))
}
