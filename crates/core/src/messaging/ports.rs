//! Port definitions for WhatsApp messaging

use agendapro_domain::{MessageKind, MessageTemplate, MessagingInstance, Result};
use async_trait::async_trait;
use uuid::Uuid;

/// Result of provisioning an instance on the gateway
#[derive(Debug, Clone)]
pub struct ProvisionedInstance {
    /// Base64 pairing QR code, when the gateway returned one
    pub qr_code: Option<String>,
}

/// Outbound operations against the WhatsApp gateway
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Provision a named instance in QR-code mode
    async fn create_instance(&self, instance_name: &str) -> Result<ProvisionedInstance>;

    /// Raw connection state as reported by the gateway (`open` means paired)
    async fn connection_state(&self, instance_name: &str) -> Result<String>;

    /// Request a fresh pairing QR code for a not-yet-paired instance
    async fn refresh_qr(&self, instance_name: &str) -> Result<Option<String>>;

    /// Tear the instance down on the gateway side
    async fn delete_instance(&self, instance_name: &str) -> Result<()>;

    /// Send a text message to a normalized phone number
    async fn send_text(&self, instance_name: &str, number: &str, text: &str) -> Result<()>;
}

/// Storage for per-tenant message templates
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Create or replace the template for `(tenant, kind)`
    async fn upsert(&self, template: &MessageTemplate) -> Result<()>;

    /// Template for one notification kind
    async fn get(&self, tenant_id: Uuid, kind: MessageKind) -> Result<Option<MessageTemplate>>;

    /// All templates of the tenant
    async fn list(&self, tenant_id: Uuid) -> Result<Vec<MessageTemplate>>;
}

/// Storage for messaging instance rows
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Create or replace the tenant's instance row
    async fn upsert(&self, instance: &MessagingInstance) -> Result<()>;

    /// The tenant's instance row, if provisioned
    async fn get_by_tenant(&self, tenant_id: Uuid) -> Result<Option<MessagingInstance>>;

    /// Remove the tenant's instance row
    async fn delete_by_tenant(&self, tenant_id: Uuid) -> Result<()>;

    /// Every stored instance, for the status monitor
    async fn list_all(&self) -> Result<Vec<MessagingInstance>>;
}
