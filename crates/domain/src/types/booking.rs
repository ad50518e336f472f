//! Booking types: clients, service offerings, appointments

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_status_conversions;
use crate::types::messaging::MessageKind;

/// A contact that can be booked for appointments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A named offering with a fixed duration and price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub duration_minutes: u32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing a service offering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceOffering {
    pub name: String,
    pub duration_minutes: u32,
    pub price: f64,
}

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl_status_conversions!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

/// Per-kind dispatch flags; each transitions false to true exactly once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesSent {
    #[serde(default)]
    pub confirmation: bool,
    #[serde(default)]
    pub reminder_24h: bool,
    #[serde(default)]
    pub reminder_1h: bool,
    #[serde(default)]
    pub cancellation: bool,
}

impl MessagesSent {
    /// Whether the given notification kind has been dispatched
    pub fn is_sent(&self, kind: MessageKind) -> bool {
        match kind {
            MessageKind::Confirmation => self.confirmation,
            MessageKind::Reminder24h => self.reminder_24h,
            MessageKind::Reminder1h => self.reminder_1h,
            MessageKind::Cancellation => self.cancellation,
        }
    }

    /// Record a successful dispatch; never cleared
    pub fn mark_sent(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::Confirmation => self.confirmation = true,
            MessageKind::Reminder24h => self.reminder_24h = true,
            MessageKind::Reminder1h => self.reminder_1h = true,
            MessageKind::Cancellation => self.cancellation = true,
        }
    }
}

/// A booked time slot for a client and service
///
/// `service_name`, `duration_minutes`, and `price` are captured from the
/// service offering at creation time and stay unchanged when the offering is
/// later edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub price: f64,
    pub status: AppointmentStatus,
    pub google_event_id: Option<String>,
    pub is_synced_to_google: bool,
    #[serde(default)]
    pub messages_sent: MessagesSent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Start of the booked interval in minutes from midnight
    pub fn start_minutes(&self) -> i64 {
        i64::from(self.start_time.hour()) * 60 + i64::from(self.start_time.minute())
    }

    /// End of the booked interval in minutes from midnight (exclusive, may
    /// pass 1440 for slots running past midnight)
    pub fn end_minutes(&self) -> i64 {
        self.start_minutes() + i64::from(self.duration_minutes)
    }
}

/// Candidate slot fed to the overlap checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
}

impl CandidateSlot {
    /// Start of the candidate interval in minutes from midnight
    pub fn start_minutes(&self) -> i64 {
        i64::from(self.start_time.hour()) * 60 + i64::from(self.start_time.minute())
    }

    /// End of the candidate interval in minutes from midnight (exclusive)
    pub fn end_minutes(&self) -> i64 {
        self.start_minutes() + i64::from(self.duration_minutes)
    }
}

/// Payload for creating an appointment
///
/// `price` defaults to the referenced service's current price when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Partial update for an appointment; absent fields are untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}
