//! Port definitions for user administration

use agendapro_domain::{AdminLogEntry, Result, UserAccount, UserRole};
use async_trait::async_trait;
use uuid::Uuid;

/// Directory of managed user accounts
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Every account, newest first
    async fn list_users(&self) -> Result<Vec<UserAccount>>;

    /// One account by id
    async fn get_user(&self, id: Uuid) -> Result<Option<UserAccount>>;

    /// Replace the account's password credential
    async fn set_password(&self, id: Uuid, new_password: &str) -> Result<()>;

    /// Replace the account's role
    async fn set_role(&self, id: Uuid, role: UserRole) -> Result<()>;

    /// Remove the account
    async fn delete_user(&self, id: Uuid) -> Result<()>;
}

/// Append-only audit trail of administrative actions
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one entry
    async fn record(&self, entry: &AdminLogEntry) -> Result<()>;

    /// Most recent entries, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<AdminLogEntry>>;
}
