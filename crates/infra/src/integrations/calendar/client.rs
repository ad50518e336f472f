//! Google Calendar API client and token refresh endpoint.
//!
//! Events land in the tenant's `primary` calendar. Wall-clock start and end
//! values are sent with the configured timezone attached; the provider owns
//! the UTC conversion.

use std::time::Duration;

use agendapro_core::{CalendarAuth, CalendarProvider, EventDetails, RefreshedToken};
use agendapro_domain::{AgendaError, CalendarConfig, Result as DomainResult};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::InfraError;

const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Client for the calendar events API.
pub struct GoogleCalendarClient {
    client: Client,
    api_base_url: String,
    timezone: String,
}

impl GoogleCalendarClient {
    /// Build an events client from the calendar section of the config.
    pub fn new(config: &CalendarConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(map_http_error)?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timezone: config.timezone.clone(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.api_base_url)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/calendars/primary/events/{}", self.api_base_url, event_id)
    }

    fn payload<'a>(&'a self, event: &'a EventDetails) -> EventPayload<'a> {
        EventPayload {
            summary: &event.summary,
            description: &event.description,
            start: EventTime {
                date_time: event.start.format(EVENT_TIME_FORMAT).to_string(),
                time_zone: &self.timezone,
            },
            end: EventTime {
                date_time: event.end.format(EVENT_TIME_FORMAT).to_string(),
                time_zone: &self.timezone,
            },
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn create_event(&self, access_token: &str, event: &EventDetails) -> DomainResult<String> {
        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(&self.payload(event))
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(response, "event create").await?;

        let created: CreatedEventResponse = response.json().await.map_err(map_http_error)?;
        debug!(event_id = %created.id, "calendar event created");
        Ok(created.id)
    }

    async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        event: &EventDetails,
    ) -> DomainResult<()> {
        let response = self
            .client
            .put(self.event_url(event_id))
            .bearer_auth(access_token)
            .json(&self.payload(event))
            .send()
            .await
            .map_err(map_http_error)?;
        check_status(response, "event update").await?;
        Ok(())
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> DomainResult<()> {
        let response = self
            .client
            .delete(self.event_url(event_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_http_error)?;

        // Gone and NotFound mean the event is already absent, which is the
        // state a delete wants.
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            debug!(event_id = %event_id, "calendar event already absent");
            return Ok(());
        }
        check_status(response, "event delete").await?;
        Ok(())
    }
}

/// Token refresh against the OAuth token endpoint.
pub struct GoogleCalendarAuth {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleCalendarAuth {
    /// Build a token refresher from the calendar section of the config.
    pub fn new(config: &CalendarConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(map_http_error)?;

        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl CalendarAuth for GoogleCalendarAuth {
    async fn refresh_access_token(&self, refresh_token: &str) -> DomainResult<RefreshedToken> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(AgendaError::Auth(format!("token refresh failed ({status}): {body}")));
        }

        let refreshed: TokenRefreshResponse = response.json().await.map_err(map_http_error)?;
        Ok(RefreshedToken {
            access_token: refreshed.access_token,
            expires_in_seconds: refreshed.expires_in,
        })
    }
}

#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTime<'a>,
    end: EventTime<'a>,
}

#[derive(Debug, Serialize)]
struct EventTime<'a> {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedEventResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_in: i64,
}

async fn check_status(response: Response, context: &str) -> DomainResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
    let message = format!("{context} failed ({status}): {body}");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgendaError::Auth(message),
        StatusCode::NOT_FOUND => AgendaError::NotFound(message),
        _ => AgendaError::ExternalService(message),
    })
}

fn map_http_error(err: reqwest::Error) -> AgendaError {
    AgendaError::from(InfraError::from(err))
}
