//! Macro for implementing Display and FromStr for status enums
//!
//! Eliminates boilerplate for status enum conversions by providing a single
//! implementation for both Display and FromStr traits. Parsing is
//! case-insensitive; output is the canonical lowercase form.
//!
//! # Example
//!
//! ```rust
//! use agendapro_domain::impl_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum JobStatus {
//!     Pending,
//!     Sent,
//!     Failed,
//! }
//!
//! impl_status_conversions!(JobStatus {
//!     Pending => "pending",
//!     Sent => "sent",
//!     Failed => "failed",
//! });
//! ```

/// Implements Display and FromStr traits for status enums
///
/// Generates:
/// - Display: converts enum variants to their canonical strings
/// - FromStr: parses case-insensitive strings to enum variants
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
