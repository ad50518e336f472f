//! SQLite-backed implementation of the calendar sync outbox.
//!
//! `dequeue_batch` claims jobs inside a `BEGIN IMMEDIATE` transaction so two
//! workers can never pick up the same job. Claimed jobs move to `processing`
//! with their attempt counter incremented before the transaction commits.
//! A due row whose operation no longer parses is failed in place within the
//! same transaction; one poisoned row must not stall the queue.

use std::sync::Arc;

use agendapro_core::OutboxQueue;
use agendapro_domain::{
    AgendaError, Result as DomainResult, SyncJob, SyncJobStatus, SyncOperation,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row, TransactionBehavior};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed outbox queue.
pub struct SqliteOutboxRepository {
    db: Arc<DbManager>,
}

impl SqliteOutboxRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OutboxQueue for SqliteOutboxRepository {
    async fn enqueue(&self, job: &SyncJob) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_insert = job.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                OUTBOX_INSERT_SQL,
                params![
                    to_insert.id.to_string(),
                    to_insert.tenant_id.to_string(),
                    to_insert.appointment_id.to_string(),
                    to_insert.operation.to_string(),
                    to_insert.google_event_id,
                    to_insert.status.to_string(),
                    i64::from(to_insert.attempts),
                    to_insert.last_error,
                    to_insert.next_attempt_at.timestamp(),
                    to_insert.created_at.timestamp(),
                    to_insert.processed_at.map(|t| t.timestamp()),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn dequeue_batch(&self, limit: usize) -> DomainResult<Vec<SyncJob>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncJob>> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            let due = {
                let mut stmt = tx.prepare(OUTBOX_DUE_SQL).map_err(map_sql_error)?;
                let rows = stmt
                    .query_map(
                        params![Utc::now().timestamp(), usize_to_i64(limit)],
                        map_due_row,
                    )
                    .map_err(map_sql_error)?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(map_sql_error)?;
                rows
            };

            let mut claimed = Vec::with_capacity(due.len());
            for row in due {
                match row {
                    DueRow::Job(mut job) => {
                        tx.execute(OUTBOX_CLAIM_SQL, params![job.id.to_string()])
                            .map_err(map_sql_error)?;
                        job.status = SyncJobStatus::Processing;
                        job.attempts += 1;
                        claimed.push(job);
                    }
                    DueRow::Unprocessable { id, reason } => {
                        warn!(
                            job_id = %id,
                            reason = %reason,
                            "unprocessable outbox row, failing it in place"
                        );
                        tx.execute(
                            OUTBOX_FAIL_SQL,
                            params![id, reason, Utc::now().timestamp()],
                        )
                        .map_err(map_sql_error)?;
                    }
                }
            }

            tx.commit().map_err(map_sql_error)?;
            Ok(claimed)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_sent(&self, id: Uuid) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE sync_outbox
                        SET status = 'sent', last_error = NULL, processed_at = ?2
                      WHERE id = ?1",
                    params![id.to_string(), Utc::now().timestamp()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("outbox job {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let reason = error.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE sync_outbox
                        SET status = 'failed', last_error = ?2, processed_at = ?3
                      WHERE id = ?1",
                    params![id.to_string(), reason, Utc::now().timestamp()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("outbox job {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn reschedule(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let reason = error.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE sync_outbox
                        SET status = 'pending', last_error = ?2, next_attempt_at = ?3
                      WHERE id = ?1",
                    params![id.to_string(), reason, next_attempt_at.timestamp()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("outbox job {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

const OUTBOX_INSERT_SQL: &str = "INSERT INTO sync_outbox (
        id, tenant_id, appointment_id, operation, google_event_id, status, attempts, last_error,
        next_attempt_at, created_at, processed_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const OUTBOX_DUE_SQL: &str = "SELECT id, tenant_id, appointment_id, operation, google_event_id,
        status, attempts, last_error, next_attempt_at, created_at, processed_at
    FROM sync_outbox
    WHERE status = 'pending' AND next_attempt_at <= ?1
    ORDER BY next_attempt_at ASC, created_at ASC
    LIMIT ?2";

const OUTBOX_CLAIM_SQL: &str = "UPDATE sync_outbox
    SET status = 'processing', attempts = attempts + 1
    WHERE id = ?1";

const OUTBOX_FAIL_SQL: &str = "UPDATE sync_outbox
    SET status = 'failed', last_error = ?2, processed_at = ?3
    WHERE id = ?1";

/// A due row, either a claimable job or one whose operation no longer parses.
enum DueRow {
    Job(SyncJob),
    Unprocessable { id: String, reason: String },
}

/// The operation cannot be defaulted the way the status can; a job with an
/// unknown operation is unprocessable and is quarantined by the claim loop.
fn map_due_row(row: &Row<'_>) -> rusqlite::Result<DueRow> {
    let id_raw: String = row.get(0)?;
    let operation_raw: String = row.get(3)?;
    let operation = match operation_raw.parse::<SyncOperation>() {
        Ok(operation) => operation,
        Err(err) => return Ok(DueRow::Unprocessable { id: id_raw, reason: err }),
    };

    let status_raw: String = row.get(5)?;
    let attempts: i64 = row.get(6)?;

    Ok(DueRow::Job(SyncJob {
        id: parse_uuid(0, &id_raw)?,
        tenant_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        appointment_id: parse_uuid(2, &row.get::<_, String>(2)?)?,
        operation,
        google_event_id: row.get(4)?,
        status: parse_status(&id_raw, &status_raw),
        attempts: u32::try_from(attempts).unwrap_or_default(),
        last_error: row.get(7)?,
        next_attempt_at: datetime_from_secs(row.get(8)?),
        created_at: datetime_from_secs(row.get(9)?),
        processed_at: row.get::<_, Option<i64>>(10)?.map(datetime_from_secs),
    }))
}

/// Job status defaults to pending on bad data so the worker retries rather
/// than losing the job.
fn parse_status(id: &str, raw: &str) -> SyncJobStatus {
    match raw.parse::<SyncJobStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(
                job_id = %id,
                raw_status = %raw,
                error = %err,
                "invalid outbox status in database, defaulting to pending"
            );
            SyncJobStatus::Pending
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
        AgendaError::Internal("outbox task cancelled".into())
    } else {
        AgendaError::Internal(format!("outbox task panic: {err}"))
    }
}
