//! Port interfaces for booking persistence

use agendapro_domain::{Appointment, Client, MessagesSent, Result, ServiceOffering};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// Trait for appointment persistence
///
/// `insert_checked` and `update_checked` run the overlap re-check inside the
/// storage transaction and fail with `Conflict`, closing the gap between the
/// service-level pre-check and the write.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Insert a new appointment, re-validating overlap transactionally
    async fn insert_checked(&self, appointment: &Appointment) -> Result<()>;

    /// Persist changes to an appointment, re-validating overlap
    /// transactionally while excluding the appointment's own row
    async fn update_checked(&self, appointment: &Appointment) -> Result<()>;

    /// Fetch a single appointment by id within a tenant
    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Appointment>>;

    /// Remove an appointment row entirely
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<()>;

    /// All of a tenant's appointments on one date, ordered by start time
    async fn find_by_date(&self, tenant_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>>;

    /// A tenant's appointments within an inclusive date range, ordered by
    /// date then start time
    async fn find_in_range(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>>;

    /// Appointments across all tenants whose slot begins inside the given
    /// window; used by the reminder scheduler
    async fn find_in_slot_window(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Appointment>>;

    /// Store the provider event id and sync flag after a calendar sync
    async fn set_sync_state(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        google_event_id: Option<&str>,
        is_synced: bool,
    ) -> Result<()>;

    /// Persist the per-kind dispatch flags
    async fn set_messages_sent(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        flags: &MessagesSent,
    ) -> Result<()>;
}

/// Trait for client directory persistence
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn insert(&self, client: &Client) -> Result<()>;
    async fn update(&self, client: &Client) -> Result<()>;
    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Client>>;
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<()>;
    async fn list(&self, tenant_id: Uuid) -> Result<Vec<Client>>;
}

/// Trait for service catalog persistence
#[async_trait]
pub trait ServiceCatalogRepository: Send + Sync {
    async fn insert(&self, service: &ServiceOffering) -> Result<()>;
    async fn update(&self, service: &ServiceOffering) -> Result<()>;
    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ServiceOffering>>;
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<()>;
    async fn list(&self, tenant_id: Uuid) -> Result<Vec<ServiceOffering>>;
}
