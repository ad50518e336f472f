//! Notification dispatch and template management

use std::sync::Arc;

use agendapro_domain::{
    AgendaError, InstanceStatus, MessageKind, MessageTemplate, Result,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ports::{InstanceRepository, MessageGateway, TemplateRepository};
use super::render::{normalize_phone, render_template};
use crate::scheduling::ports::{AppointmentRepository, ClientRepository};

/// WhatsApp notification service
///
/// Renders the tenant's template for a notification kind and dispatches it
/// through the gateway. Each kind is sent at most once per appointment; the
/// per-kind flag is persisted only after the gateway accepted the message.
pub struct NotificationService {
    appointments: Arc<dyn AppointmentRepository>,
    clients: Arc<dyn ClientRepository>,
    templates: Arc<dyn TemplateRepository>,
    instances: Arc<dyn InstanceRepository>,
    gateway: Arc<dyn MessageGateway>,
}

impl NotificationService {
    /// Create a new notification service
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        clients: Arc<dyn ClientRepository>,
        templates: Arc<dyn TemplateRepository>,
        instances: Arc<dyn InstanceRepository>,
        gateway: Arc<dyn MessageGateway>,
    ) -> Self {
        Self { appointments, clients, templates, instances, gateway }
    }

    /// Send one notification kind for an appointment
    pub async fn send_notification(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        kind: MessageKind,
    ) -> Result<()> {
        let appointment = self
            .appointments
            .get(tenant_id, appointment_id)
            .await?
            .ok_or_else(|| AgendaError::NotFound(format!("appointment {appointment_id}")))?;

        if appointment.messages_sent.is_sent(kind) {
            return Err(AgendaError::AlreadySent(format!(
                "{kind} already sent for appointment {appointment_id}"
            )));
        }

        let client = self
            .clients
            .get(tenant_id, appointment.client_id)
            .await?
            .ok_or_else(|| AgendaError::NotFound(format!("client {}", appointment.client_id)))?;

        let phone = client
            .phone
            .as_deref()
            .and_then(normalize_phone)
            .ok_or_else(|| {
                AgendaError::Validation("client has no phone number".to_string())
            })?;

        let instance = self
            .instances
            .get_by_tenant(tenant_id)
            .await?
            .ok_or_else(|| {
                AgendaError::Validation("whatsapp instance not configured".to_string())
            })?;

        let state = self.gateway.connection_state(&instance.instance_name).await?;
        if InstanceStatus::from_gateway_state(&state) != InstanceStatus::Connected {
            return Err(AgendaError::ExternalService("whatsapp is not connected".to_string()));
        }

        let template = self
            .templates
            .get(tenant_id, kind)
            .await?
            .ok_or_else(|| AgendaError::NotFound(format!("message template {kind}")))?;

        let body = render_template(&template.content, &client, &appointment);
        self.gateway.send_text(&instance.instance_name, &phone, &body).await?;

        let mut flags = appointment.messages_sent;
        flags.mark_sent(kind);
        self.appointments.set_messages_sent(tenant_id, appointment_id, &flags).await?;

        info!(
            appointment_id = %appointment_id,
            kind = %kind,
            "notification dispatched"
        );
        Ok(())
    }

    /// All templates of the tenant
    pub async fn list_templates(&self, tenant_id: Uuid) -> Result<Vec<MessageTemplate>> {
        self.templates.list(tenant_id).await
    }

    /// Create or replace the template for one notification kind
    pub async fn upsert_template(
        &self,
        tenant_id: Uuid,
        kind: MessageKind,
        content: &str,
    ) -> Result<MessageTemplate> {
        if content.trim().is_empty() {
            return Err(AgendaError::Validation(
                "template content must not be empty".to_string(),
            ));
        }

        let template = MessageTemplate {
            id: Uuid::now_v7(),
            tenant_id,
            kind,
            content: content.to_string(),
            updated_at: Utc::now(),
        };
        self.templates.upsert(&template).await?;

        self.templates
            .get(tenant_id, kind)
            .await?
            .ok_or_else(|| AgendaError::Internal("template missing after upsert".to_string()))
    }
}
