//! Messaging instance lifecycle
//!
//! Provisioning, pairing-state reconciliation, and teardown of the tenant's
//! gateway instance. The status monitor drives `poll_all` in the background
//! so the stored state keeps tracking what the gateway reports.

use std::sync::Arc;

use agendapro_domain::constants::INSTANCE_NAME_PREFIX;
use agendapro_domain::{AgendaError, InstanceStatus, MessagingInstance, Result};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ports::{InstanceRepository, MessageGateway};

/// Gateway instance name for a tenant, derived from the account email
pub fn instance_name_for(email: &str) -> String {
    let local_part = email.split('@').next().unwrap_or("");
    format!("{INSTANCE_NAME_PREFIX}-{local_part}")
}

/// Messaging instance lifecycle service
pub struct InstanceService {
    instances: Arc<dyn InstanceRepository>,
    gateway: Arc<dyn MessageGateway>,
}

impl InstanceService {
    /// Create a new instance service
    pub fn new(instances: Arc<dyn InstanceRepository>, gateway: Arc<dyn MessageGateway>) -> Self {
        Self { instances, gateway }
    }

    /// Provision the tenant's gateway instance, or refresh it when one exists
    pub async fn connect(&self, tenant_id: Uuid, email: &str) -> Result<MessagingInstance> {
        if let Some(existing) = self.instances.get_by_tenant(tenant_id).await? {
            if let Some(refreshed) = self.reconcile(existing, true).await? {
                return Ok(refreshed);
            }
            // The gateway lost the instance; provision a fresh one below
        }

        let name = instance_name_for(email);
        let provisioned = self.gateway.create_instance(&name).await?;
        let qr_code = match provisioned.qr_code {
            Some(qr) => Some(qr),
            None => match self.gateway.refresh_qr(&name).await {
                Ok(qr) => qr,
                Err(error) => {
                    warn!(instance = %name, %error, "initial qr fetch failed");
                    None
                }
            },
        };

        let now = Utc::now();
        let instance = MessagingInstance {
            id: Uuid::now_v7(),
            tenant_id,
            instance_name: name,
            qr_code,
            status: InstanceStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.instances.upsert(&instance).await?;
        info!(instance = %instance.instance_name, "messaging instance provisioned");
        Ok(instance)
    }

    /// Current instance state, reconciled against the gateway
    pub async fn status(&self, tenant_id: Uuid) -> Result<Option<MessagingInstance>> {
        match self.instances.get_by_tenant(tenant_id).await? {
            Some(instance) => self.reconcile(instance, false).await,
            None => Ok(None),
        }
    }

    /// Re-request a pairing QR code and persist it
    pub async fn refresh_qr(&self, tenant_id: Uuid) -> Result<MessagingInstance> {
        let mut instance = self
            .instances
            .get_by_tenant(tenant_id)
            .await?
            .ok_or_else(|| AgendaError::NotFound("messaging instance".to_string()))?;

        instance.qr_code = self.gateway.refresh_qr(&instance.instance_name).await?;
        instance.updated_at = Utc::now();
        self.instances.upsert(&instance).await?;
        Ok(instance)
    }

    /// Delete the gateway instance and the local row
    pub async fn disconnect(&self, tenant_id: Uuid) -> Result<()> {
        let instance = self
            .instances
            .get_by_tenant(tenant_id)
            .await?
            .ok_or_else(|| AgendaError::NotFound("messaging instance".to_string()))?;

        match self.gateway.delete_instance(&instance.instance_name).await {
            Ok(()) => {}
            // Already gone on the gateway side; still drop the local row
            Err(AgendaError::NotFound(_)) => {
                warn!(instance = %instance.instance_name, "instance already absent on gateway");
            }
            Err(error) => return Err(error),
        }

        self.instances.delete_by_tenant(tenant_id).await?;
        info!(instance = %instance.instance_name, "messaging instance removed");
        Ok(())
    }

    /// Reconcile every stored instance against the gateway
    ///
    /// Used by the status monitor. Per-instance failures are logged and
    /// skipped so one broken instance cannot stall the sweep.
    pub async fn poll_all(&self) -> Result<Vec<MessagingInstance>> {
        let mut surviving = Vec::new();
        for instance in self.instances.list_all().await? {
            let name = instance.instance_name.clone();
            match self.reconcile(instance, false).await {
                Ok(Some(updated)) => surviving.push(updated),
                Ok(None) => {}
                Err(error) => warn!(instance = %name, %error, "status poll failed"),
            }
        }
        Ok(surviving)
    }

    /// Sync one row with the state the gateway reports
    ///
    /// Returns `None` when the gateway no longer knows the instance; the
    /// local row is removed in that case. A fresh QR is fetched when the
    /// caller asks for one or when the instance dropped out of connected,
    /// so re-pairing can start right away.
    async fn reconcile(
        &self,
        mut instance: MessagingInstance,
        want_qr: bool,
    ) -> Result<Option<MessagingInstance>> {
        let state = match self.gateway.connection_state(&instance.instance_name).await {
            Ok(state) => state,
            Err(AgendaError::NotFound(_)) => {
                warn!(
                    instance = %instance.instance_name,
                    "gateway no longer knows the instance, dropping local row"
                );
                self.instances.delete_by_tenant(instance.tenant_id).await?;
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let observed = InstanceStatus::from_gateway_state(&state);
        let dropped =
            instance.status == InstanceStatus::Connected && observed != InstanceStatus::Connected;

        let mut new_qr = None;
        if (want_qr || dropped) && observed != InstanceStatus::Connected {
            match self.gateway.refresh_qr(&instance.instance_name).await {
                Ok(qr) => new_qr = qr,
                Err(error) => {
                    warn!(instance = %instance.instance_name, %error, "qr refresh failed");
                }
            }
        }

        if observed != instance.status || new_qr.is_some() {
            if observed != instance.status {
                info!(
                    instance = %instance.instance_name,
                    from = %instance.status,
                    to = %observed,
                    "instance status changed"
                );
            }
            instance.status = observed;
            if let Some(qr) = new_qr {
                instance.qr_code = Some(qr);
            }
            instance.updated_at = Utc::now();
            self.instances.upsert(&instance).await?;
        }

        Ok(Some(instance))
    }
}
