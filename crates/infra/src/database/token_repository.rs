//! SQLite-backed implementation of the calendar token store.

use std::sync::Arc;

use agendapro_core::TokenRepository;
use agendapro_domain::{AgendaError, CalendarTokens, Result as DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed token store, one row per tenant.
pub struct SqliteTokenRepository {
    db: Arc<DbManager>,
}

impl SqliteTokenRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    async fn upsert(&self, tokens: &CalendarTokens) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_store = tokens.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                TOKEN_UPSERT_SQL,
                params![
                    to_store.tenant_id.to_string(),
                    to_store.access_token,
                    to_store.refresh_token,
                    to_store.expires_at.timestamp(),
                    to_store.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, tenant_id: Uuid) -> DomainResult<Option<CalendarTokens>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<CalendarTokens>> {
            let conn = db.get_connection()?;
            conn.query_row(TOKEN_GET_SQL, params![tenant_id.to_string()], map_token_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, tenant_id: Uuid) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            // Unlinking an already-unlinked calendar is a no-op.
            conn.execute(
                "DELETE FROM calendar_tokens WHERE tenant_id = ?1",
                params![tenant_id.to_string()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

const TOKEN_UPSERT_SQL: &str = "INSERT INTO calendar_tokens (
        tenant_id, access_token, refresh_token, expires_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(tenant_id) DO UPDATE SET
        access_token = excluded.access_token,
        refresh_token = excluded.refresh_token,
        expires_at = excluded.expires_at,
        updated_at = excluded.updated_at";

const TOKEN_GET_SQL: &str = "SELECT tenant_id, access_token, refresh_token, expires_at, updated_at
    FROM calendar_tokens
    WHERE tenant_id = ?1";

fn map_token_row(row: &Row<'_>) -> rusqlite::Result<CalendarTokens> {
    Ok(CalendarTokens {
        tenant_id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        access_token: row.get(1)?,
        refresh_token: row.get(2)?,
        expires_at: datetime_from_secs(row.get(3)?),
        updated_at: datetime_from_secs(row.get(4)?),
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
        AgendaError::Internal("token task cancelled".into())
    } else {
        AgendaError::Internal(format!("token task panic: {err}"))
    }
}
