//! Appointment booking service - core business logic

use std::sync::Arc;

use agendapro_domain::{
    AgendaError, Appointment, AppointmentPatch, AppointmentStatus, CandidateSlot, MessagesSent,
    NewAppointment, Result, SyncJob, SyncOperation,
};
use chrono::{NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use super::conflict::has_conflict;
use super::ports::{AppointmentRepository, ClientRepository, ServiceCatalogRepository};
use crate::sync::ports::OutboxQueue;

/// Outcome of a booking mutation
///
/// `warning` is set when the primary write succeeded but a best-effort
/// secondary step (calendar sync enqueue) failed.
#[derive(Debug, Clone)]
pub struct BookingResult {
    pub appointment: Appointment,
    pub warning: Option<String>,
}

/// Appointment booking service
///
/// Orchestrates create/update/delete against the overlap checker and the
/// persistence ports, and queues calendar sync work through the outbox.
pub struct BookingService {
    appointments: Arc<dyn AppointmentRepository>,
    clients: Arc<dyn ClientRepository>,
    catalog: Arc<dyn ServiceCatalogRepository>,
    outbox: Arc<dyn OutboxQueue>,
}

impl BookingService {
    /// Create a new booking service
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        clients: Arc<dyn ClientRepository>,
        catalog: Arc<dyn ServiceCatalogRepository>,
        outbox: Arc<dyn OutboxQueue>,
    ) -> Self {
        Self { appointments, clients, catalog, outbox }
    }

    /// Book a new appointment with status `pending`.
    ///
    /// Duration, service name, and (absent an explicit override) price are
    /// captured from the service offering at this moment and never change
    /// when the offering is later edited.
    pub async fn create(&self, tenant_id: Uuid, input: NewAppointment) -> Result<BookingResult> {
        let client = self
            .clients
            .get(tenant_id, input.client_id)
            .await?
            .ok_or_else(|| AgendaError::NotFound(format!("client {}", input.client_id)))?;

        let service = self
            .catalog
            .get(tenant_id, input.service_id)
            .await?
            .ok_or_else(|| AgendaError::NotFound(format!("service {}", input.service_id)))?;

        let price = input.price.unwrap_or(service.price);
        if price < 0.0 {
            return Err(AgendaError::Validation("price must not be negative".to_string()));
        }

        let candidate = CandidateSlot {
            date: input.date,
            start_time: input.start_time,
            duration_minutes: service.duration_minutes,
        };
        self.ensure_slot_free(tenant_id, &candidate, None).await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::now_v7(),
            tenant_id,
            client_id: client.id,
            service_id: service.id,
            service_name: service.name,
            date: input.date,
            start_time: input.start_time,
            duration_minutes: service.duration_minutes,
            price,
            status: AppointmentStatus::Pending,
            google_event_id: None,
            is_synced_to_google: false,
            messages_sent: MessagesSent::default(),
            created_at: now,
            updated_at: now,
        };

        self.appointments.insert_checked(&appointment).await?;

        let warning = self.enqueue_sync(&appointment, SyncOperation::Create).await;
        Ok(BookingResult { appointment, warning })
    }

    /// Apply a partial update, re-validating overlap excluding the
    /// appointment's own slot.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<BookingResult> {
        let current = self.require(tenant_id, id).await?;
        let mut updated = current.clone();

        if let Some(client_id) = patch.client_id {
            self.clients
                .get(tenant_id, client_id)
                .await?
                .ok_or_else(|| AgendaError::NotFound(format!("client {client_id}")))?;
            updated.client_id = client_id;
        }

        if let Some(service_id) = patch.service_id {
            let service = self
                .catalog
                .get(tenant_id, service_id)
                .await?
                .ok_or_else(|| AgendaError::NotFound(format!("service {service_id}")))?;
            let service_changed = service_id != current.service_id;
            updated.service_id = service.id;
            updated.service_name = service.name;
            updated.duration_minutes = service.duration_minutes;
            if patch.price.is_none() && service_changed {
                updated.price = service.price;
            }
        }

        if let Some(date) = patch.date {
            updated.date = date;
        }
        if let Some(start_time) = patch.start_time {
            updated.start_time = start_time;
        }
        if let Some(price) = patch.price {
            updated.price = price;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }

        if updated.price < 0.0 {
            return Err(AgendaError::Validation("price must not be negative".to_string()));
        }

        if updated.status != AppointmentStatus::Cancelled {
            let candidate = CandidateSlot {
                date: updated.date,
                start_time: updated.start_time,
                duration_minutes: updated.duration_minutes,
            };
            self.ensure_slot_free(tenant_id, &candidate, Some(id)).await?;
        }

        updated.updated_at = Utc::now();
        self.appointments.update_checked(&updated).await?;

        let warning = self.enqueue_sync(&updated, SyncOperation::Update).await;
        Ok(BookingResult { appointment: updated, warning })
    }

    /// Remove an appointment entirely.
    ///
    /// A calendar-deletion job is enqueued only when the appointment was
    /// previously synced; its failure never blocks the removal. Returns the
    /// best-effort warning, if any.
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<String>> {
        let current = self.require(tenant_id, id).await?;

        let mut warning = None;
        if current.is_synced_to_google {
            warning = self.enqueue_sync(&current, SyncOperation::Delete).await;
        }

        self.appointments.delete(tenant_id, id).await?;
        Ok(warning)
    }

    /// Explicit transition to `confirmed`
    pub async fn confirm(&self, tenant_id: Uuid, id: Uuid) -> Result<BookingResult> {
        self.set_status(tenant_id, id, AppointmentStatus::Confirmed).await
    }

    /// Explicit transition to `cancelled`; frees the slot without removing
    /// the row
    pub async fn cancel(&self, tenant_id: Uuid, id: Uuid) -> Result<BookingResult> {
        self.set_status(tenant_id, id, AppointmentStatus::Cancelled).await
    }

    /// Fetch a single appointment
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Appointment> {
        self.require(tenant_id, id).await
    }

    /// A tenant's appointments on one date
    pub async fn list_by_date(&self, tenant_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>> {
        self.appointments.find_by_date(tenant_id, date).await
    }

    /// A tenant's appointments within an inclusive date range
    pub async fn list_in_range(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>> {
        if from > to {
            return Err(AgendaError::Validation("range start is after range end".to_string()));
        }
        self.appointments.find_in_range(tenant_id, from, to).await
    }

    async fn set_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<BookingResult> {
        let patch = AppointmentPatch { status: Some(status), ..AppointmentPatch::default() };
        self.update(tenant_id, id, patch).await
    }

    async fn require(&self, tenant_id: Uuid, id: Uuid) -> Result<Appointment> {
        self.appointments
            .get(tenant_id, id)
            .await?
            .ok_or_else(|| AgendaError::NotFound(format!("appointment {id}")))
    }

    /// Advisory overlap check against the tenant's non-cancelled
    /// appointments on the candidate date. The repository repeats the check
    /// inside its write transaction.
    async fn ensure_slot_free(
        &self,
        tenant_id: Uuid,
        candidate: &CandidateSlot,
        exclude_id: Option<Uuid>,
    ) -> Result<()> {
        let existing: Vec<Appointment> = self
            .appointments
            .find_by_date(tenant_id, candidate.date)
            .await?
            .into_iter()
            .filter(|appointment| appointment.status != AppointmentStatus::Cancelled)
            .collect();

        if has_conflict(candidate, exclude_id, &existing) {
            return Err(AgendaError::Conflict(format!(
                "time slot {} on {} overlaps an existing appointment",
                candidate.start_time, candidate.date
            )));
        }
        Ok(())
    }

    /// Best-effort enqueue of a calendar sync job; failures become warnings
    async fn enqueue_sync(
        &self,
        appointment: &Appointment,
        operation: SyncOperation,
    ) -> Option<String> {
        let job = SyncJob::new(
            appointment.tenant_id,
            appointment.id,
            operation,
            appointment.google_event_id.clone(),
        );

        match self.outbox.enqueue(&job).await {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    appointment_id = %appointment.id,
                    operation = %operation,
                    error = %err,
                    "failed to enqueue calendar sync job"
                );
                Some(format!("appointment saved, but calendar sync could not be scheduled: {err}"))
            }
        }
    }
}
