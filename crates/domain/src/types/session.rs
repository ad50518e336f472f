//! Request session identity
//!
//! Extracted per request from the fronting auth layer and passed explicitly
//! into every service call. There is no ambient global user state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::admin::UserRole;

/// The authenticated identity for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl Session {
    /// Whether this session may perform admin panel operations
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
