//! HTTP client for an Evolution-style WhatsApp gateway.
//!
//! Instances are provisioned in QR-code pairing mode and addressed by name.
//! Every request carries the shared `apikey` header; the gateway reports
//! pairing state as a string where `open` means connected.

use std::time::Duration;

use agendapro_core::{MessageGateway, ProvisionedInstance};
use agendapro_domain::constants::GATEWAY_INTEGRATION;
use agendapro_domain::{AgendaError, MessagingConfig, Result as DomainResult};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::InfraError;

/// Client for the WhatsApp gateway's instance and message endpoints.
pub struct EvolutionGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EvolutionGateway {
    /// Build a gateway client from the messaging section of the config.
    pub fn new(config: &MessagingConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(map_http_error)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read the response body and map a non-success status onto a domain
    /// error. 404 carries the instance name so callers can react to a
    /// gateway-side deletion.
    async fn check_status(
        response: Response,
        instance_name: &str,
        context: &str,
    ) -> DomainResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
        if status == StatusCode::NOT_FOUND {
            return Err(AgendaError::NotFound(format!("gateway instance {instance_name}")));
        }
        Err(AgendaError::ExternalService(format!("{context} failed ({status}): {body}")))
    }
}

#[async_trait]
impl MessageGateway for EvolutionGateway {
    async fn create_instance(&self, instance_name: &str) -> DomainResult<ProvisionedInstance> {
        debug!(instance = %instance_name, "provisioning gateway instance");

        let body = json!({
            "instanceName": instance_name,
            "qrcode": true,
            "integration": GATEWAY_INTEGRATION,
            "token": self.api_key,
        });

        let response = self
            .client
            .post(self.url("/instance/create"))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = Self::check_status(response, instance_name, "instance create").await?;

        let payload: CreateInstanceResponse = response.json().await.map_err(map_http_error)?;
        Ok(ProvisionedInstance { qr_code: payload.qrcode.and_then(|qr| qr.base64) })
    }

    async fn connection_state(&self, instance_name: &str) -> DomainResult<String> {
        let response = self
            .client
            .get(self.url(&format!("/instance/connectionState/{instance_name}")))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = Self::check_status(response, instance_name, "connection state").await?;

        let payload: ConnectionStateResponse = response.json().await.map_err(map_http_error)?;
        Ok(payload.instance.state)
    }

    async fn refresh_qr(&self, instance_name: &str) -> DomainResult<Option<String>> {
        let response = self
            .client
            .get(self.url(&format!("/instance/connect/{instance_name}")))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = Self::check_status(response, instance_name, "qr refresh").await?;

        let payload: ConnectResponse = response.json().await.map_err(map_http_error)?;
        Ok(payload.base64)
    }

    async fn delete_instance(&self, instance_name: &str) -> DomainResult<()> {
        debug!(instance = %instance_name, "deleting gateway instance");

        let response = self
            .client
            .delete(self.url(&format!("/instance/delete/{instance_name}")))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(map_http_error)?;

        // An instance the gateway no longer knows is already deleted.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check_status(response, instance_name, "instance delete").await?;
        Ok(())
    }

    async fn send_text(&self, instance_name: &str, number: &str, text: &str) -> DomainResult<()> {
        let body = json!({
            "number": number,
            "text": text,
        });

        let response = self
            .client
            .post(self.url(&format!("/message/sendText/{instance_name}")))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        Self::check_status(response, instance_name, "message send").await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CreateInstanceResponse {
    #[serde(default)]
    qrcode: Option<QrCodePayload>,
}

#[derive(Debug, Deserialize)]
struct QrCodePayload {
    #[serde(default)]
    base64: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionStateResponse {
    instance: InstanceState,
}

#[derive(Debug, Deserialize)]
struct InstanceState {
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    #[serde(default)]
    base64: Option<String>,
}

fn map_http_error(err: reqwest::Error) -> AgendaError {
    AgendaError::from(InfraError::from(err))
}
