//! # Agenda Pro Domain
//!
//! Business domain types and models for Agenda Pro.
//!
//! This crate contains:
//! - Domain data types (Client, ServiceOffering, Appointment, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and conversion macros
//!
//! ## Architecture
//! - No dependencies on other Agenda Pro crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
