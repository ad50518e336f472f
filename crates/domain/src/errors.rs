//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Agenda Pro
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AgendaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already sent: {0}")]
    AlreadySent(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Agenda Pro operations
pub type Result<T> = std::result::Result<T, AgendaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgendaError::Conflict("time slot already booked".to_string());
        assert_eq!(err.to_string(), "Conflict: time slot already booked");
    }

    #[test]
    fn test_error_serialization_tag_content() {
        let err = AgendaError::NotFound("service 42".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "NotFound");
        assert_eq!(json["message"], "service 42");
    }

    #[test]
    fn test_error_round_trip() {
        let err = AgendaError::AlreadySent("confirmation".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: AgendaError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
