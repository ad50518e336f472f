//! SQLite-backed implementation of the message template store.

use std::sync::Arc;

use agendapro_core::TemplateRepository;
use agendapro_domain::{AgendaError, MessageKind, MessageTemplate, Result as DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed template store keyed by `(tenant, kind)`.
pub struct SqliteTemplateRepository {
    db: Arc<DbManager>,
}

impl SqliteTemplateRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateRepository for SqliteTemplateRepository {
    async fn upsert(&self, template: &MessageTemplate) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_store = template.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                TEMPLATE_UPSERT_SQL,
                params![
                    to_store.id.to_string(),
                    to_store.tenant_id.to_string(),
                    to_store.kind.to_string(),
                    to_store.content,
                    to_store.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(
        &self,
        tenant_id: Uuid,
        kind: MessageKind,
    ) -> DomainResult<Option<MessageTemplate>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<MessageTemplate>> {
            let conn = db.get_connection()?;
            conn.query_row(
                TEMPLATE_GET_SQL,
                params![tenant_id.to_string(), kind.to_string()],
                map_template_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self, tenant_id: Uuid) -> DomainResult<Vec<MessageTemplate>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<MessageTemplate>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(TEMPLATE_LIST_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![tenant_id.to_string()], map_template_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

const TEMPLATE_UPSERT_SQL: &str = "INSERT INTO message_templates (
        id, tenant_id, kind, content, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(tenant_id, kind) DO UPDATE SET
        content = excluded.content,
        updated_at = excluded.updated_at";

const TEMPLATE_GET_SQL: &str = "SELECT id, tenant_id, kind, content, updated_at
    FROM message_templates
    WHERE tenant_id = ?1 AND kind = ?2";

const TEMPLATE_LIST_SQL: &str = "SELECT id, tenant_id, kind, content, updated_at
    FROM message_templates
    WHERE tenant_id = ?1
    ORDER BY kind ASC";

fn map_template_row(row: &Row<'_>) -> rusqlite::Result<MessageTemplate> {
    let id_raw: String = row.get(0)?;
    let kind_raw: String = row.get(2)?;

    Ok(MessageTemplate {
        id: parse_uuid(0, &id_raw)?,
        tenant_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        kind: parse_kind(&id_raw, &kind_raw)?,
        content: row.get(3)?,
        updated_at: datetime_from_secs(row.get(4)?),
    })
}

fn parse_kind(id: &str, raw: &str) -> rusqlite::Result<MessageKind> {
    raw.parse::<MessageKind>().map_err(|e| {
        warn!(template_id = %id, raw_kind = %raw, "unknown message kind in database");
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
    })
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
        AgendaError::Internal("template task cancelled".into())
    } else {
        AgendaError::Internal(format!("template task panic: {err}"))
    }
}
