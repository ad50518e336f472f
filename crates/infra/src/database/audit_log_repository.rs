//! SQLite-backed implementation of the admin audit trail.

use std::sync::Arc;

use agendapro_core::AuditLogRepository;
use agendapro_domain::{AdminLogEntry, AgendaError, Result as DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed, append-only audit log.
pub struct SqliteAuditLogRepository {
    db: Arc<DbManager>,
}

impl SqliteAuditLogRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLogRepository for SqliteAuditLogRepository {
    async fn record(&self, entry: &AdminLogEntry) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_insert = entry.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                AUDIT_INSERT_SQL,
                params![
                    to_insert.id.to_string(),
                    to_insert.admin_user_id.to_string(),
                    to_insert.target_user_id.map(|id| id.to_string()),
                    to_insert.action,
                    to_insert.details.to_string(),
                    to_insert.ip_address,
                    to_insert.user_agent,
                    to_insert.created_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_recent(&self, limit: usize) -> DomainResult<Vec<AdminLogEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<AdminLogEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(AUDIT_RECENT_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![usize_to_i64(limit)], map_log_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

const AUDIT_INSERT_SQL: &str = "INSERT INTO admin_logs (
        id, admin_user_id, target_user_id, action, details, ip_address, user_agent, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const AUDIT_RECENT_SQL: &str = "SELECT id, admin_user_id, target_user_id, action, details,
        ip_address, user_agent, created_at
    FROM admin_logs
    ORDER BY created_at DESC, rowid DESC
    LIMIT ?1";

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<AdminLogEntry> {
    let id_raw: String = row.get(0)?;
    let details_raw: String = row.get(4)?;

    Ok(AdminLogEntry {
        id: parse_uuid(0, &id_raw)?,
        admin_user_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        target_user_id: row
            .get::<_, Option<String>>(2)?
            .map(|raw| parse_uuid(2, &raw))
            .transpose()?,
        action: row.get(3)?,
        details: parse_details(&id_raw, &details_raw),
        ip_address: row.get(5)?,
        user_agent: row.get(6)?,
        created_at: datetime_from_secs(row.get(7)?),
    })
}

fn parse_details(id: &str, raw: &str) -> serde_json::Value {
    match serde_json::from_str(raw) {
        Ok(details) => details,
        Err(err) => {
            warn!(entry_id = %id, error = %err, "invalid audit details payload in database");
            serde_json::Value::Null
        }
    }
}

fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn datetime_from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn map_sql_error(err: rusqlite::Error) -> AgendaError {
    AgendaError::from(InfraError::from(err))
}

fn map_join_error(err: task::JoinError) -> AgendaError {
    if err.is_cancelled() {
        AgendaError::Internal("audit log task cancelled".into())
    } else {
        AgendaError::Internal(format!("audit log task panic: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn record_and_list_round_trips() {
        let (repo, _manager, _temp_dir) = setup_repository().await;
        let entry = sample_entry("password_reset_by_admin", json!({"timestamp": "2025-03-10"}));

        repo.record(&entry).await.expect("record succeeds");

        let listed = repo.list_recent(10).await.expect("list succeeds");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].action, "password_reset_by_admin");
        assert_eq!(listed[0].details["timestamp"], "2025-03-10");
        assert_eq!(listed[0].target_user_id, entry.target_user_id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_recent_is_newest_first_and_limited() {
        let (repo, _manager, _temp_dir) = setup_repository().await;

        for i in 0..5 {
            let mut entry = sample_entry("role_changed_by_admin", json!({"seq": i}));
            entry.created_at = datetime_from_secs(1_700_000_000 + i);
            repo.record(&entry).await.expect("record succeeds");
        }

        let listed = repo.list_recent(3).await.expect("list succeeds");
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].details["seq"], 4);
        assert_eq!(listed[2].details["seq"], 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn entry_without_target_round_trips() {
        let (repo, _manager, _temp_dir) = setup_repository().await;
        let mut entry = sample_entry("user_deleted_by_admin", json!({}));
        entry.target_user_id = None;
        entry.ip_address = None;
        entry.user_agent = None;

        repo.record(&entry).await.expect("record succeeds");

        let listed = repo.list_recent(1).await.expect("list succeeds");
        assert!(listed[0].target_user_id.is_none());
        assert!(listed[0].ip_address.is_none());
    }

    async fn setup_repository() -> (SqliteAuditLogRepository, Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("manager created");
        manager.run_migrations().expect("migrations applied");
        let manager = Arc::new(manager);
        let repo = SqliteAuditLogRepository::new(Arc::clone(&manager));

        (repo, manager, temp_dir)
    }

    fn sample_entry(action: &str, details: serde_json::Value) -> AdminLogEntry {
        AdminLogEntry {
            id: Uuid::now_v7(),
            admin_user_id: Uuid::now_v7(),
            target_user_id: Some(Uuid::now_v7()),
            action: action.into(),
            details,
            ip_address: Some("203.0.113.9".into()),
            user_agent: Some("Mozilla/5.0".into()),
            created_at: Utc::now(),
        }
    }
}
