//! Calendar sync service - executes outbox jobs against the provider

use std::sync::Arc;

use agendapro_domain::{
    AgendaError, Appointment, Client, Result, SyncJob, SyncOperation,
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ports::{CalendarAuth, CalendarProvider, EventDetails, TokenRepository};
use crate::scheduling::ports::{AppointmentRepository, ClientRepository};
use crate::sync::ports::SyncJobHandler;

/// Calendar synchronization service
///
/// Refreshes the tenant's access token when expired, maps appointments onto
/// provider events, and writes the provider event id back after creation.
pub struct CalendarSyncService {
    tokens: Arc<dyn TokenRepository>,
    auth: Arc<dyn CalendarAuth>,
    provider: Arc<dyn CalendarProvider>,
    appointments: Arc<dyn AppointmentRepository>,
    clients: Arc<dyn ClientRepository>,
}

impl CalendarSyncService {
    /// Create a new calendar sync service
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        auth: Arc<dyn CalendarAuth>,
        provider: Arc<dyn CalendarProvider>,
        appointments: Arc<dyn AppointmentRepository>,
        clients: Arc<dyn ClientRepository>,
    ) -> Self {
        Self { tokens, auth, provider, appointments, clients }
    }

    /// Whether the tenant has linked a calendar account
    pub async fn is_linked(&self, tenant_id: Uuid) -> Result<bool> {
        Ok(self.tokens.get(tenant_id).await?.is_some())
    }

    /// Execute one sync job against the provider
    pub async fn execute(&self, job: &SyncJob) -> Result<()> {
        let access_token = self.access_token(job.tenant_id).await?;

        match job.operation {
            SyncOperation::Create => self.create(job, &access_token).await,
            SyncOperation::Update => self.update(job, &access_token).await,
            SyncOperation::Delete => self.delete(job, &access_token).await,
        }
    }

    /// Current access token for the tenant, refreshed and persisted when the
    /// stored one has expired
    async fn access_token(&self, tenant_id: Uuid) -> Result<String> {
        let mut tokens = self
            .tokens
            .get(tenant_id)
            .await?
            .ok_or_else(|| AgendaError::ExternalService("calendar not connected".to_string()))?;

        let now = Utc::now();
        if tokens.is_expired(now) {
            debug!(tenant_id = %tenant_id, "access token expired, refreshing");
            let refreshed = self.auth.refresh_access_token(&tokens.refresh_token).await?;

            tokens.access_token = refreshed.access_token;
            tokens.expires_at = now + Duration::seconds(refreshed.expires_in_seconds);
            tokens.updated_at = now;
            self.tokens.upsert(&tokens).await?;
        }

        Ok(tokens.access_token)
    }

    async fn create(&self, job: &SyncJob, access_token: &str) -> Result<()> {
        let Some(appointment) = self.appointments.get(job.tenant_id, job.appointment_id).await?
        else {
            warn!(appointment_id = %job.appointment_id, "appointment gone before sync, skipping");
            return Ok(());
        };

        let event = self.event_details(&appointment).await?;
        let event_id = self.provider.create_event(access_token, &event).await?;

        self.appointments
            .set_sync_state(job.tenant_id, appointment.id, Some(&event_id), true)
            .await?;
        debug!(appointment_id = %appointment.id, event_id = %event_id, "calendar event created");
        Ok(())
    }

    async fn update(&self, job: &SyncJob, access_token: &str) -> Result<()> {
        let Some(appointment) = self.appointments.get(job.tenant_id, job.appointment_id).await?
        else {
            warn!(appointment_id = %job.appointment_id, "appointment gone before sync, skipping");
            return Ok(());
        };

        // Never synced yet: fall back to creating the event
        let Some(event_id) = appointment.google_event_id.clone() else {
            return self.create(job, access_token).await;
        };

        let event = self.event_details(&appointment).await?;
        self.provider.update_event(access_token, &event_id, &event).await?;
        debug!(appointment_id = %appointment.id, event_id = %event_id, "calendar event updated");
        Ok(())
    }

    async fn delete(&self, job: &SyncJob, access_token: &str) -> Result<()> {
        let Some(event_id) = job.google_event_id.as_deref() else {
            warn!(appointment_id = %job.appointment_id, "delete job has no event id, skipping");
            return Ok(());
        };

        self.provider.delete_event(access_token, event_id).await?;
        debug!(appointment_id = %job.appointment_id, event_id = %event_id, "calendar event deleted");
        Ok(())
    }

    async fn event_details(&self, appointment: &Appointment) -> Result<EventDetails> {
        let client: Client = self
            .clients
            .get(appointment.tenant_id, appointment.client_id)
            .await?
            .ok_or_else(|| {
                AgendaError::NotFound(format!("client {}", appointment.client_id))
            })?;

        let start = NaiveDateTime::new(appointment.date, appointment.start_time);
        let end = start + Duration::minutes(i64::from(appointment.duration_minutes));

        Ok(EventDetails {
            summary: format!("{} - {}", client.name, appointment.service_name),
            description: format!(
                "Agendamento via Agenda Pro\n\nCliente: {}\nServiço: {}\nDuração: {} minutos",
                client.name, appointment.service_name, appointment.duration_minutes
            ),
            start,
            end,
        })
    }
}

#[async_trait]
impl SyncJobHandler for CalendarSyncService {
    async fn handle(&self, job: &SyncJob) -> Result<()> {
        self.execute(job).await
    }
}

#[cfg(test)]
mod tests {
    use agendapro_domain::{AppointmentStatus, CalendarTokens, MessagesSent};
    use chrono::{NaiveDate, NaiveTime};
    use tokio::sync::Mutex;

    use super::super::ports::RefreshedToken;
    use super::*;

    struct MockTokens {
        row: Mutex<Option<CalendarTokens>>,
        upserts: Mutex<u32>,
    }

    #[async_trait]
    impl TokenRepository for MockTokens {
        async fn upsert(&self, tokens: &CalendarTokens) -> Result<()> {
            *self.row.lock().await = Some(tokens.clone());
            *self.upserts.lock().await += 1;
            Ok(())
        }

        async fn get(&self, _tenant_id: Uuid) -> Result<Option<CalendarTokens>> {
            Ok(self.row.lock().await.clone())
        }

        async fn delete(&self, _tenant_id: Uuid) -> Result<()> {
            *self.row.lock().await = None;
            Ok(())
        }
    }

    struct MockAuth {
        refreshes: Mutex<u32>,
    }

    #[async_trait]
    impl CalendarAuth for MockAuth {
        async fn refresh_access_token(&self, _refresh_token: &str) -> Result<RefreshedToken> {
            *self.refreshes.lock().await += 1;
            Ok(RefreshedToken {
                access_token: "fresh-token".to_string(),
                expires_in_seconds: 3600,
            })
        }
    }

    #[derive(Default)]
    struct MockProvider {
        created: Mutex<Vec<EventDetails>>,
        updated: Mutex<Vec<(String, EventDetails)>>,
        deleted: Mutex<Vec<String>>,
        tokens_seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CalendarProvider for MockProvider {
        async fn create_event(&self, access_token: &str, event: &EventDetails) -> Result<String> {
            self.tokens_seen.lock().await.push(access_token.to_string());
            self.created.lock().await.push(event.clone());
            Ok("evt-new".to_string())
        }

        async fn update_event(
            &self,
            access_token: &str,
            event_id: &str,
            event: &EventDetails,
        ) -> Result<()> {
            self.tokens_seen.lock().await.push(access_token.to_string());
            self.updated.lock().await.push((event_id.to_string(), event.clone()));
            Ok(())
        }

        async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<()> {
            self.tokens_seen.lock().await.push(access_token.to_string());
            self.deleted.lock().await.push(event_id.to_string());
            Ok(())
        }
    }

    // Reuse the booking mocks through small local impls
    struct MemAppointments {
        rows: Mutex<Vec<Appointment>>,
    }

    #[async_trait]
    impl AppointmentRepository for MemAppointments {
        async fn insert_checked(&self, appointment: &Appointment) -> Result<()> {
            self.rows.lock().await.push(appointment.clone());
            Ok(())
        }

        async fn update_checked(&self, appointment: &Appointment) -> Result<()> {
            let mut rows = self.rows.lock().await;
            if let Some(row) = rows.iter_mut().find(|row| row.id == appointment.id) {
                *row = appointment.clone();
            }
            Ok(())
        }

        async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Appointment>> {
            Ok(self
                .rows
                .lock()
                .await
                .iter()
                .find(|row| row.tenant_id == tenant_id && row.id == id)
                .cloned())
        }

        async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
            self.rows.lock().await.retain(|row| !(row.tenant_id == tenant_id && row.id == id));
            Ok(())
        }

        async fn find_by_date(
            &self,
            _tenant_id: Uuid,
            _date: NaiveDate,
        ) -> Result<Vec<Appointment>> {
            Ok(Vec::new())
        }

        async fn find_in_range(
            &self,
            _tenant_id: Uuid,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<Appointment>> {
            Ok(Vec::new())
        }

        async fn find_in_slot_window(
            &self,
            _from: NaiveDateTime,
            _to: NaiveDateTime,
        ) -> Result<Vec<Appointment>> {
            Ok(Vec::new())
        }

        async fn set_sync_state(
            &self,
            tenant_id: Uuid,
            id: Uuid,
            google_event_id: Option<&str>,
            is_synced: bool,
        ) -> Result<()> {
            let mut rows = self.rows.lock().await;
            if let Some(row) =
                rows.iter_mut().find(|row| row.tenant_id == tenant_id && row.id == id)
            {
                row.google_event_id = google_event_id.map(str::to_string);
                row.is_synced_to_google = is_synced;
            }
            Ok(())
        }

        async fn set_messages_sent(
            &self,
            _tenant_id: Uuid,
            _id: Uuid,
            _flags: &MessagesSent,
        ) -> Result<()> {
            Ok(())
        }
    }

    struct MemClients {
        rows: Mutex<Vec<Client>>,
    }

    #[async_trait]
    impl ClientRepository for MemClients {
        async fn insert(&self, client: &Client) -> Result<()> {
            self.rows.lock().await.push(client.clone());
            Ok(())
        }

        async fn update(&self, _client: &Client) -> Result<()> {
            Ok(())
        }

        async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Client>> {
            Ok(self
                .rows
                .lock()
                .await
                .iter()
                .find(|row| row.tenant_id == tenant_id && row.id == id)
                .cloned())
        }

        async fn delete(&self, _tenant_id: Uuid, _id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn list(&self, _tenant_id: Uuid) -> Result<Vec<Client>> {
            Ok(Vec::new())
        }
    }

    struct Fixture {
        service: CalendarSyncService,
        tokens: Arc<MockTokens>,
        auth: Arc<MockAuth>,
        provider: Arc<MockProvider>,
        appointments: Arc<MemAppointments>,
        tenant_id: Uuid,
        appointment_id: Uuid,
    }

    fn fixture(token_expired: bool) -> Fixture {
        let tenant_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let appointment_id = Uuid::new_v4();
        let now = Utc::now();

        let expires_at =
            if token_expired { now - Duration::hours(1) } else { now + Duration::hours(1) };

        let tokens = Arc::new(MockTokens {
            row: Mutex::new(Some(CalendarTokens {
                tenant_id,
                access_token: "stale-token".to_string(),
                refresh_token: "refresh".to_string(),
                expires_at,
                updated_at: now,
            })),
            upserts: Mutex::new(0),
        });
        let auth = Arc::new(MockAuth { refreshes: Mutex::new(0) });
        let provider = Arc::new(MockProvider::default());

        let appointments = Arc::new(MemAppointments {
            rows: Mutex::new(vec![Appointment {
                id: appointment_id,
                tenant_id,
                client_id,
                service_id: Uuid::new_v4(),
                service_name: "Haircut".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                duration_minutes: 60,
                price: 50.0,
                status: AppointmentStatus::Pending,
                google_event_id: None,
                is_synced_to_google: false,
                messages_sent: MessagesSent::default(),
                created_at: now,
                updated_at: now,
            }]),
        });

        let clients = Arc::new(MemClients {
            rows: Mutex::new(vec![Client {
                id: client_id,
                tenant_id,
                name: "Maria Silva".to_string(),
                email: None,
                phone: None,
                created_at: now,
                updated_at: now,
            }]),
        });

        let service = CalendarSyncService::new(
            tokens.clone(),
            auth.clone(),
            provider.clone(),
            appointments.clone(),
            clients,
        );

        Fixture { service, tokens, auth, provider, appointments, tenant_id, appointment_id }
    }

    fn create_job(fx: &Fixture) -> SyncJob {
        SyncJob::new(fx.tenant_id, fx.appointment_id, SyncOperation::Create, None)
    }

    #[tokio::test]
    async fn test_create_stores_event_id_and_sync_flag() {
        let fx = fixture(false);

        fx.service.execute(&create_job(&fx)).await.unwrap();

        let created = fx.provider.created.lock().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].summary, "Maria Silva - Haircut");
        assert!(created[0].description.contains("Duração: 60 minutos"));
        assert_eq!(
            created[0].end - created[0].start,
            Duration::minutes(60),
            "end is start plus the captured duration"
        );

        let row =
            fx.appointments.get(fx.tenant_id, fx.appointment_id).await.unwrap().unwrap();
        assert_eq!(row.google_event_id.as_deref(), Some("evt-new"));
        assert!(row.is_synced_to_google);
    }

    #[tokio::test]
    async fn test_valid_token_is_not_refreshed() {
        let fx = fixture(false);

        fx.service.execute(&create_job(&fx)).await.unwrap();

        assert_eq!(*fx.auth.refreshes.lock().await, 0);
        assert_eq!(fx.provider.tokens_seen.lock().await[0], "stale-token");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let fx = fixture(true);

        fx.service.execute(&create_job(&fx)).await.unwrap();

        assert_eq!(*fx.auth.refreshes.lock().await, 1);
        assert_eq!(*fx.tokens.upserts.lock().await, 1);
        assert_eq!(fx.provider.tokens_seen.lock().await[0], "fresh-token");

        let stored = fx.tokens.row.lock().await.clone().unwrap();
        assert_eq!(stored.access_token, "fresh-token");
        assert!(stored.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_unlinked_tenant_fails() {
        let fx = fixture(false);
        *fx.tokens.row.lock().await = None;

        let result = fx.service.execute(&create_job(&fx)).await;
        assert!(matches!(result, Err(AgendaError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_update_without_event_id_falls_back_to_create() {
        let fx = fixture(false);
        let job = SyncJob::new(fx.tenant_id, fx.appointment_id, SyncOperation::Update, None);

        fx.service.execute(&job).await.unwrap();

        assert_eq!(fx.provider.created.lock().await.len(), 1);
        assert!(fx.provider.updated.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_with_event_id_updates_in_place() {
        let fx = fixture(false);
        fx.appointments
            .set_sync_state(fx.tenant_id, fx.appointment_id, Some("evt-7"), true)
            .await
            .unwrap();
        let job = SyncJob::new(fx.tenant_id, fx.appointment_id, SyncOperation::Update, None);

        fx.service.execute(&job).await.unwrap();

        let updated = fx.provider.updated.lock().await;
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, "evt-7");
    }

    #[tokio::test]
    async fn test_delete_uses_job_event_id() {
        let fx = fixture(false);
        let job = SyncJob::new(
            fx.tenant_id,
            fx.appointment_id,
            SyncOperation::Delete,
            Some("evt-9".to_string()),
        );

        fx.service.execute(&job).await.unwrap();

        assert_eq!(fx.provider.deleted.lock().await.as_slice(), ["evt-9".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_job_for_missing_appointment_succeeds() {
        let fx = fixture(false);
        let job = SyncJob::new(fx.tenant_id, Uuid::new_v4(), SyncOperation::Create, None);

        // The appointment vanished before the worker ran; nothing to do
        fx.service.execute(&job).await.unwrap();
        assert!(fx.provider.created.lock().await.is_empty());
    }
}
