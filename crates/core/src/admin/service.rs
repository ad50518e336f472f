//! Administrative user management

use std::sync::Arc;

use agendapro_domain::constants::DEFAULT_ADMIN_LOG_LIMIT;
use agendapro_domain::{
    AdminLogEntry, AgendaError, RequestMeta, Result, Session, UserAccount, UserRole,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::password::validate_password_strength;
use super::ports::{AuditLogRepository, UserDirectory};

/// Admin panel service
///
/// Every operation requires an admin session and leaves an audit trail entry
/// with the acting admin, the target, and the request metadata. Audit write
/// failures are logged but never fail the action itself.
pub struct AdminService {
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditLogRepository>,
}

impl AdminService {
    /// Create a new admin service
    pub fn new(users: Arc<dyn UserDirectory>, audit: Arc<dyn AuditLogRepository>) -> Self {
        Self { users, audit }
    }

    /// Every managed account, newest first
    pub async fn list_users(&self, session: &Session) -> Result<Vec<UserAccount>> {
        require_admin(session)?;
        self.users.list_users().await
    }

    /// Reset a user's password after validating its strength
    pub async fn reset_password(
        &self,
        session: &Session,
        meta: &RequestMeta,
        target_id: Uuid,
        new_password: &str,
    ) -> Result<()> {
        require_admin(session)?;
        validate_password_strength(new_password)?;

        self.users.set_password(target_id, new_password).await?;
        info!(admin = %session.user_id, target = %target_id, "password reset by admin");

        self.record_audit(
            session,
            meta,
            target_id,
            "password_reset_by_admin",
            json!({ "timestamp": Utc::now().to_rfc3339() }),
        )
        .await;
        Ok(())
    }

    /// Change a user's role
    ///
    /// Admins cannot change their own role, so the panel can never lock its
    /// last admin out by accident.
    pub async fn change_role(
        &self,
        session: &Session,
        meta: &RequestMeta,
        target_id: Uuid,
        new_role: UserRole,
    ) -> Result<()> {
        require_admin(session)?;
        if target_id == session.user_id {
            return Err(AgendaError::Validation("cannot change your own role".to_string()));
        }

        self.users.set_role(target_id, new_role).await?;
        info!(admin = %session.user_id, target = %target_id, role = %new_role, "role changed");

        self.record_audit(
            session,
            meta,
            target_id,
            "role_changed_by_admin",
            json!({ "new_role": new_role, "timestamp": Utc::now().to_rfc3339() }),
        )
        .await;
        Ok(())
    }

    /// Delete a user account
    ///
    /// The deleted account's data is captured in the audit entry before the
    /// row disappears. Admins cannot delete themselves.
    pub async fn delete_user(
        &self,
        session: &Session,
        meta: &RequestMeta,
        target_id: Uuid,
    ) -> Result<()> {
        require_admin(session)?;
        if target_id == session.user_id {
            return Err(AgendaError::Validation("cannot delete your own account".to_string()));
        }

        let target = self
            .users
            .get_user(target_id)
            .await?
            .ok_or_else(|| AgendaError::NotFound(format!("user {target_id}")))?;

        self.users.delete_user(target_id).await?;
        info!(admin = %session.user_id, target = %target_id, "user deleted");

        self.record_audit(
            session,
            meta,
            target_id,
            "user_deleted_by_admin",
            json!({
                "deleted_user": { "email": target.email, "role": target.role },
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        Ok(())
    }

    /// Most recent audit entries, newest first
    pub async fn list_logs(
        &self,
        session: &Session,
        limit: Option<usize>,
    ) -> Result<Vec<AdminLogEntry>> {
        require_admin(session)?;
        self.audit.list_recent(limit.unwrap_or(DEFAULT_ADMIN_LOG_LIMIT)).await
    }

    async fn record_audit(
        &self,
        session: &Session,
        meta: &RequestMeta,
        target_id: Uuid,
        action: &str,
        details: serde_json::Value,
    ) {
        let entry = AdminLogEntry {
            id: Uuid::now_v7(),
            admin_user_id: session.user_id,
            target_user_id: Some(target_id),
            action: action.to_string(),
            details,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: Utc::now(),
        };

        if let Err(error) = self.audit.record(&entry).await {
            warn!(action, %error, "audit log write failed");
        }
    }
}

fn require_admin(session: &Session) -> Result<()> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(AgendaError::Auth("admin privileges required".to_string()))
    }
}
