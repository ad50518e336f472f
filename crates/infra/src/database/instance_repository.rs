//! SQLite-backed implementation of the messaging instance store.

use std::sync::Arc;

use agendapro_core::InstanceRepository;
use agendapro_domain::{AgendaError, InstanceStatus, MessagingInstance, Result as DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed instance store, one row per tenant.
pub struct SqliteInstanceRepository {
    db: Arc<DbManager>,
}

impl SqliteInstanceRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InstanceRepository for SqliteInstanceRepository {
    async fn upsert(&self, instance: &MessagingInstance) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_store = instance.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                INSTANCE_UPSERT_SQL,
                params![
                    to_store.id.to_string(),
                    to_store.tenant_id.to_string(),
                    to_store.instance_name,
                    to_store.qr_code,
                    to_store.status.to_string(),
                    to_store.created_at.timestamp(),
                    to_store.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_by_tenant(&self, tenant_id: Uuid) -> DomainResult<Option<MessagingInstance>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<MessagingInstance>> {
            let conn = db.get_connection()?;
            conn.query_row(INSTANCE_GET_SQL, params![tenant_id.to_string()], map_instance_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_by_tenant(&self, tenant_id: Uuid) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "DELETE FROM messaging_instances WHERE tenant_id = ?1",
                    params![tenant_id.to_string()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!(
                    "messaging instance for tenant {tenant_id}"
                )));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_all(&self) -> DomainResult<Vec<MessagingInstance>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<MessagingInstance>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(INSTANCE_LIST_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], map_instance_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

const INSTANCE_UPSERT_SQL: &str = "INSERT INTO messaging_instances (
        id, tenant_id, instance_name, qr_code, status, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(tenant_id) DO UPDATE SET
        instance_name = excluded.instance_name,
        qr_code = excluded.qr_code,
        status = excluded.status,
        updated_at = excluded.updated_at";

const INSTANCE_GET_SQL: &str = "SELECT id, tenant_id, instance_name, qr_code, status, created_at,
        updated_at
    FROM messaging_instances
    WHERE tenant_id = ?1";

const INSTANCE_LIST_SQL: &str = "SELECT id, tenant_id, instance_name, qr_code, status, created_at,
        updated_at
    FROM messaging_instances
    ORDER BY created_at ASC";

fn map_instance_row(row: &Row<'_>) -> rusqlite::Result<MessagingInstance> {
    let id_raw: String = row.get(0)?;
    let status_raw: String = row.get(4)?;

    Ok(MessagingInstance {
        id: parse_uuid(0, &id_raw)?,
        tenant_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        instance_name: row.get(2)?,
        qr_code: row.get(3)?,
        status: parse_status(&id_raw, &status_raw),
        created_at: datetime_from_secs(row.get(5)?),
        updated_at: datetime_from_secs(row.get(6)?),
    })
}

fn parse_status(id: &str, raw: &str) -> InstanceStatus {
    match raw.parse::<InstanceStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(
                instance_id = %id,
                raw_status = %raw,
                error = %err,
                "invalid instance status in database, defaulting to pending"
            );
            InstanceStatus::Pending
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

fn map_sql_error(err: rusqlite::Error) -> AgendaError {
    AgendaError::from(InfraError::from(err))
}

fn map_join_error(err: task::JoinError) -> AgendaError {
    if err.is_cancelled() {
        AgendaError::Internal("instance task cancelled".into())
    } else {
        AgendaError::Internal(format!("instance task panic: {err}"))
    }
}
