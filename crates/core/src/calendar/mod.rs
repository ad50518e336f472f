//! Calendar synchronization: token handling and event mapping

pub mod ports;
pub mod service;

pub use service::CalendarSyncService;
