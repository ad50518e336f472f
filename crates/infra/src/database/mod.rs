//! Database implementations

pub mod appointment_repository;
pub mod audit_log_repository;
pub mod client_repository;
pub mod instance_repository;
pub mod manager;
pub mod outbox_repository;
pub mod service_repository;
pub mod template_repository;
pub mod token_repository;
pub mod user_directory;

pub use appointment_repository::*;
pub use audit_log_repository::*;
pub use client_repository::*;
pub use instance_repository::*;
pub use manager::*;
pub use outbox_repository::*;
pub use service_repository::*;
pub use template_repository::*;
pub use token_repository::*;
pub use user_directory::*;
