//! Appointment booking: overlap detection and the booking service

pub mod conflict;
pub mod ports;
pub mod service;

pub use service::{BookingResult, BookingService};
