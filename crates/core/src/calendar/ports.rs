//! Port interfaces for the calendar provider integration

use agendapro_domain::{CalendarTokens, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

/// Event fields handed to the provider client
///
/// Start and end are local wall-clock values; the provider adapter attaches
/// the configured timezone when building the wire payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub summary: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A freshly minted access token from the OAuth token endpoint
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in_seconds: i64,
}

/// Trait for persisting a tenant's calendar OAuth tokens
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert or replace the tenant's token row
    async fn upsert(&self, tokens: &CalendarTokens) -> Result<()>;

    /// Fetch the tenant's tokens, if the calendar is linked
    async fn get(&self, tenant_id: Uuid) -> Result<Option<CalendarTokens>>;

    /// Drop the tenant's tokens (unlink)
    async fn delete(&self, tenant_id: Uuid) -> Result<()>;
}

/// Trait for the OAuth token endpoint
#[async_trait]
pub trait CalendarAuth: Send + Sync {
    /// Exchange a refresh token for a new access token
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshedToken>;
}

/// Trait for the provider's event API
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Create an event; returns the provider-assigned event id
    async fn create_event(&self, access_token: &str, event: &EventDetails) -> Result<String>;

    /// Replace an existing event
    async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        event: &EventDetails,
    ) -> Result<()>;

    /// Delete an event; an already-deleted event is not an error
    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<()>;
}
