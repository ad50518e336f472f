//! Calendar provider types: OAuth tokens and sync outbox jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_status_conversions;

/// OAuth tokens for a tenant's linked calendar account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarTokens {
    pub tenant_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarTokens {
    /// Whether the access token needs a refresh before use
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Calendar operation carried by an outbox job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl_status_conversions!(SyncOperation {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// Processing state of an outbox job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncJobStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl_status_conversions!(SyncJobStatus {
    Pending => "pending",
    Processing => "processing",
    Sent => "sent",
    Failed => "failed",
});

/// A queued calendar sync operation, committed alongside the primary write
///
/// Delete jobs carry `google_event_id` themselves because the appointment row
/// is gone by the time the worker runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub appointment_id: Uuid,
    pub operation: SyncOperation,
    pub google_event_id: Option<String>,
    pub status: SyncJobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    /// New pending job ready for immediate pickup
    pub fn new(
        tenant_id: Uuid,
        appointment_id: Uuid,
        operation: SyncOperation,
        google_event_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            appointment_id,
            operation,
            google_event_id,
            status: SyncJobStatus::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: now,
            created_at: now,
            processed_at: None,
        }
    }
}
