//! Outbox contracts for calendar synchronization

pub mod ports;
