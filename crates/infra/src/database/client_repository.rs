//! SQLite-backed implementation of the client directory port.

use std::sync::Arc;

use agendapro_core::ClientRepository;
use agendapro_domain::{AgendaError, Client, Result as DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed client directory.
pub struct SqliteClientRepository {
    db: Arc<DbManager>,
}

impl SqliteClientRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    async fn insert(&self, client: &Client) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_insert = client.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                CLIENT_INSERT_SQL,
                params![
                    to_insert.id.to_string(),
                    to_insert.tenant_id.to_string(),
                    to_insert.name,
                    to_insert.email,
                    to_insert.phone,
                    to_insert.created_at.timestamp(),
                    to_insert.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, client: &Client) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_update = client.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    CLIENT_UPDATE_SQL,
                    params![
                        to_update.tenant_id.to_string(),
                        to_update.id.to_string(),
                        to_update.name,
                        to_update.email,
                        to_update.phone,
                        to_update.updated_at.timestamp(),
                    ],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("client {}", to_update.id)));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Client>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Client>> {
            let conn = db.get_connection()?;
            conn.query_row(
                CLIENT_GET_SQL,
                params![tenant_id.to_string(), id.to_string()],
                map_client_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "DELETE FROM clients WHERE tenant_id = ?1 AND id = ?2",
                    params![tenant_id.to_string(), id.to_string()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("client {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self, tenant_id: Uuid) -> DomainResult<Vec<Client>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Client>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(CLIENT_LIST_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![tenant_id.to_string()], map_client_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

const CLIENT_INSERT_SQL: &str = "INSERT INTO clients (
        id, tenant_id, name, email, phone, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const CLIENT_UPDATE_SQL: &str = "UPDATE clients SET name = ?3, email = ?4, phone = ?5,
        updated_at = ?6
    WHERE tenant_id = ?1 AND id = ?2";

const CLIENT_GET_SQL: &str = "SELECT id, tenant_id, name, email, phone, created_at, updated_at
    FROM clients
    WHERE tenant_id = ?1 AND id = ?2";

const CLIENT_LIST_SQL: &str = "SELECT id, tenant_id, name, email, phone, created_at, updated_at
    FROM clients
    WHERE tenant_id = ?1
    ORDER BY name COLLATE NOCASE ASC";

fn map_client_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        created_at: datetime_from_secs(row.get(5)?),
        updated_at: datetime_from_secs(row.get(6)?),
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
        AgendaError::Internal("client task cancelled".into())
    } else {
        AgendaError::Internal(format!("client task panic: {err}"))
    }
}
