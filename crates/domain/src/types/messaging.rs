//! Messaging types: notification kinds, templates, gateway instances

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_status_conversions;

/// Notification type dispatched to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "confirmation")]
    Confirmation,
    #[serde(rename = "reminder_24h")]
    Reminder24h,
    #[serde(rename = "reminder_1h")]
    Reminder1h,
    #[serde(rename = "cancellation")]
    Cancellation,
}

impl MessageKind {
    /// Every notification kind, in template-listing order
    pub const ALL: [Self; 4] =
        [Self::Confirmation, Self::Reminder24h, Self::Reminder1h, Self::Cancellation];
}

impl_status_conversions!(MessageKind {
    Confirmation => "confirmation",
    Reminder24h => "reminder_24h",
    Reminder1h => "reminder_1h",
    Cancellation => "cancellation",
});

/// Editable message body for one notification kind
///
/// Placeholders `{name}`, `{email}`, `{date}`, `{service}`, `{time}` are
/// substituted at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// Gateway connection state of a messaging instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Pending,
    Connecting,
    Connected,
    Disconnected,
}

impl InstanceStatus {
    /// Map the gateway's reported connection state onto the local status
    pub fn from_gateway_state(state: &str) -> Self {
        if state.eq_ignore_ascii_case("open") {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

impl_status_conversions!(InstanceStatus {
    Pending => "pending",
    Connecting => "connecting",
    Connected => "connected",
    Disconnected => "disconnected",
});

/// The tenant's logical session with the messaging gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingInstance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub instance_name: String,
    pub qr_code: Option<String>,
    pub status: InstanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
