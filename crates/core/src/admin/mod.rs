//! Admin panel: user management, password policy, audit trail

pub mod password;
pub mod ports;
pub mod service;

pub use password::validate_password_strength;
pub use service::AdminService;
