//! Web OAuth flow for linking a tenant's calendar account.
//!
//! The tenant's browser is sent to the provider's consent screen; the
//! callback code is exchanged server-side for an access and refresh token
//! pair. `access_type=offline` with `prompt=consent` forces the provider to
//! issue a refresh token on every link.

use std::time::Duration;

use agendapro_domain::constants::GOOGLE_CALENDAR_SCOPE;
use agendapro_domain::{AgendaError, CalendarConfig, Result as DomainResult};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::errors::InfraError;

/// Tokens returned by the authorization-code exchange.
#[derive(Debug, Clone)]
pub struct ExchangedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_seconds: i64,
}

/// Authorization-code flow against the configured OAuth endpoints.
pub struct GoogleOAuthFlow {
    client: Client,
    auth_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuthFlow {
    /// Build the flow from the calendar section of the config.
    pub fn new(config: &CalendarConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(map_http_error)?;

        Ok(Self {
            client,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Consent screen URL for the tenant's browser. `state` round-trips
    /// through the provider and comes back on the callback.
    pub fn authorize_url(&self, state: &str) -> DomainResult<String> {
        if self.client_id.is_empty() {
            return Err(AgendaError::Config("calendar client id not configured".into()));
        }

        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| AgendaError::Config(format!("invalid auth url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", GOOGLE_CALENDAR_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange the callback code for an access and refresh token pair.
    pub async fn exchange_code(&self, code: &str) -> DomainResult<ExchangedTokens> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(AgendaError::Auth(format!("code exchange failed ({status}): {body}")));
        }

        let payload: TokenExchangeResponse = response.json().await.map_err(map_http_error)?;
        let refresh_token = payload.refresh_token.ok_or_else(|| {
            AgendaError::Auth("authorization response carried no refresh token".into())
        })?;

        Ok(ExchangedTokens {
            access_token: payload.access_token,
            refresh_token,
            expires_in_seconds: payload.expires_in,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

fn map_http_error(err: reqwest::Error) -> AgendaError {
    AgendaError::from(InfraError::from(err))
}
