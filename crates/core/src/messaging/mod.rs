//! WhatsApp messaging: notification dispatch, templates, instance lifecycle

pub mod instances;
pub mod notifications;
pub mod ports;
pub mod render;

pub use instances::{instance_name_for, InstanceService};
pub use notifications::NotificationService;
