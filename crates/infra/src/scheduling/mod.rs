//! Scheduling infrastructure for background task execution
//!
//! Two schedulers drive the messaging side of the system:
//! - Instance monitor (adaptive polling of gateway connection state)
//! - Reminder scheduler (cron-based reminder dispatch)
//!
//! Both follow the same runtime rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations

pub mod error;
pub mod instance_monitor;
pub mod reminder_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use instance_monitor::{InstanceMonitor, InstanceMonitorConfig};
pub use reminder_scheduler::{ReminderScheduler, ReminderSchedulerConfig};
