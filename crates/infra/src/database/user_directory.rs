//! SQLite-backed implementation of the user directory port.
//!
//! Passwords are stored as argon2id PHC strings; the plaintext never leaves
//! the hashing call.

use std::sync::Arc;

use agendapro_core::UserDirectory;
use agendapro_domain::{AgendaError, Result as DomainResult, UserAccount, UserRole};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed user directory.
pub struct SqliteUserDirectory {
    db: Arc<DbManager>,
}

impl SqliteUserDirectory {
    /// Construct a directory backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn list_users(&self) -> DomainResult<Vec<UserAccount>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<UserAccount>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(USER_LIST_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], map_user_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_user(&self, id: Uuid) -> DomainResult<Option<UserAccount>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<UserAccount>> {
            let conn = db.get_connection()?;
            conn.query_row(USER_GET_SQL, params![id.to_string()], map_user_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_password(&self, id: Uuid, new_password: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let password = new_password.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let password_hash = hash_password(&password)?;

            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE users SET password_hash = ?2 WHERE id = ?1",
                    params![id.to_string(), password_hash],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("user {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_role(&self, id: Uuid, role: UserRole) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE users SET role = ?2 WHERE id = ?1",
                    params![id.to_string(), role.to_string()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("user {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_user(&self, id: Uuid) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("user {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

const USER_LIST_SQL: &str = "SELECT id, email, role, created_at
    FROM users
    ORDER BY created_at DESC, rowid DESC";

const USER_GET_SQL: &str = "SELECT id, email, role, created_at FROM users WHERE id = ?1";

fn hash_password(password: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AgendaError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    let id_raw: String = row.get(0)?;
    let role_raw: String = row.get(2)?;

    Ok(UserAccount {
        id: parse_uuid(0, &id_raw)?,
        email: row.get(1)?,
        role: parse_role(&id_raw, &role_raw),
        created_at: datetime_from_secs(row.get(3)?),
    })
}

fn parse_role(id: &str, raw: &str) -> UserRole {
    match raw.parse::<UserRole>() {
        Ok(role) => role,
        Err(err) => {
            warn!(
                user_id = %id,
                raw_role = %raw,
                error = %err,
                "invalid user role in database, defaulting to professional"
            );
            UserRole::Professional
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
        AgendaError::Internal("user directory task cancelled".into())
    } else {
        AgendaError::Internal(format!("user directory task panic: {err}"))
    }
}
