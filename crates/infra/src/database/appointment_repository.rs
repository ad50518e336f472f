//! SQLite-backed implementation of the appointment repository port.
//!
//! `insert_checked` and `update_checked` re-run the overlap test inside a
//! `BEGIN IMMEDIATE` transaction. The write lock taken by the transaction
//! serializes bookings, so a slot that passed the service-level pre-check
//! cannot be stolen between the check and the insert.

use std::sync::Arc;

use agendapro_core::AppointmentRepository;
use agendapro_domain::{
    AgendaError, Appointment, AppointmentStatus, MessagesSent, Result as DomainResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// SQLite-backed appointment repository.
pub struct SqliteAppointmentRepository {
    db: Arc<DbManager>,
}

impl SqliteAppointmentRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// True when a non-cancelled appointment of the same tenant and date
    /// overlaps the candidate's closed-open interval. The candidate's own row
    /// is always excluded so updates do not collide with themselves.
    fn conflict_exists(conn: &Connection, appointment: &Appointment) -> DomainResult<bool> {
        let count: i64 = conn
            .query_row(
                OVERLAP_SQL,
                params![
                    appointment.tenant_id.to_string(),
                    appointment.date.format(DATE_FORMAT).to_string(),
                    appointment.id.to_string(),
                    appointment.end_minutes(),
                    appointment.start_minutes(),
                ],
                |row| row.get(0),
            )
            .map_err(map_sql_error)?;
        Ok(count > 0)
    }

    fn insert_row(conn: &Connection, appointment: &Appointment) -> DomainResult<()> {
        let flags_json = encode_flags(&appointment.messages_sent)?;
        conn.execute(
            APPOINTMENT_INSERT_SQL,
            params![
                appointment.id.to_string(),
                appointment.tenant_id.to_string(),
                appointment.client_id.to_string(),
                appointment.service_id.to_string(),
                appointment.service_name,
                appointment.date.format(DATE_FORMAT).to_string(),
                appointment.start_time.format(TIME_FORMAT).to_string(),
                appointment.start_minutes(),
                i64::from(appointment.duration_minutes),
                appointment.price,
                appointment.status.to_string(),
                appointment.google_event_id,
                bool_to_int(appointment.is_synced_to_google),
                flags_json,
                appointment.created_at.timestamp(),
                appointment.updated_at.timestamp(),
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    fn update_row(conn: &Connection, appointment: &Appointment) -> DomainResult<()> {
        let flags_json = encode_flags(&appointment.messages_sent)?;
        let changed = conn
            .execute(
                APPOINTMENT_UPDATE_SQL,
                params![
                    appointment.tenant_id.to_string(),
                    appointment.id.to_string(),
                    appointment.client_id.to_string(),
                    appointment.service_id.to_string(),
                    appointment.service_name,
                    appointment.date.format(DATE_FORMAT).to_string(),
                    appointment.start_time.format(TIME_FORMAT).to_string(),
                    appointment.start_minutes(),
                    i64::from(appointment.duration_minutes),
                    appointment.price,
                    appointment.status.to_string(),
                    appointment.google_event_id,
                    bool_to_int(appointment.is_synced_to_google),
                    flags_json,
                    appointment.updated_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;

        if changed == 0 {
            return Err(AgendaError::NotFound(format!("appointment {}", appointment.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for SqliteAppointmentRepository {
    async fn insert_checked(&self, appointment: &Appointment) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_insert = appointment.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            if Self::conflict_exists(&tx, &to_insert)? {
                return Err(AgendaError::Conflict(
                    "time slot overlaps an existing appointment".into(),
                ));
            }
            Self::insert_row(&tx, &to_insert)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_checked(&self, appointment: &Appointment) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_update = appointment.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            if Self::conflict_exists(&tx, &to_update)? {
                return Err(AgendaError::Conflict(
                    "time slot overlaps an existing appointment".into(),
                ));
            }
            Self::update_row(&tx, &to_update)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<Appointment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Appointment>> {
            let conn = db.get_connection()?;
            conn.query_row(
                APPOINTMENT_GET_SQL,
                params![tenant_id.to_string(), id.to_string()],
                map_appointment_row,
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
                    "DELETE FROM appointments WHERE tenant_id = ?1 AND id = ?2",
                    params![tenant_id.to_string(), id.to_string()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("appointment {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_date(
        &self,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> DomainResult<Vec<Appointment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Appointment>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(APPOINTMENT_BY_DATE_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params![tenant_id.to_string(), date.format(DATE_FORMAT).to_string()],
                    map_appointment_row,
                )
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_in_range(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DomainResult<Vec<Appointment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Appointment>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(APPOINTMENT_IN_RANGE_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params![
                        tenant_id.to_string(),
                        from.format(DATE_FORMAT).to_string(),
                        to.format(DATE_FORMAT).to_string(),
                    ],
                    map_appointment_row,
                )
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_in_slot_window(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> DomainResult<Vec<Appointment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Appointment>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(APPOINTMENT_SLOT_WINDOW_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params![
                        from.format("%Y-%m-%d %H:%M:%S").to_string(),
                        to.format("%Y-%m-%d %H:%M:%S").to_string(),
                    ],
                    map_appointment_row,
                )
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_sync_state(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        google_event_id: Option<&str>,
        is_synced: bool,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let event_id = google_event_id.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE appointments
                        SET google_event_id = ?3, is_synced_to_google = ?4, updated_at = ?5
                      WHERE tenant_id = ?1 AND id = ?2",
                    params![
                        tenant_id.to_string(),
                        id.to_string(),
                        event_id,
                        bool_to_int(is_synced),
                        Utc::now().timestamp(),
                    ],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("appointment {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_messages_sent(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        flags: &MessagesSent,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let flags_json = encode_flags(flags)?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE appointments SET messages_sent = ?3, updated_at = ?4
                      WHERE tenant_id = ?1 AND id = ?2",
                    params![
                        tenant_id.to_string(),
                        id.to_string(),
                        flags_json,
                        Utc::now().timestamp(),
                    ],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("appointment {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

const OVERLAP_SQL: &str = "SELECT COUNT(*) FROM appointments
    WHERE tenant_id = ?1
      AND date = ?2
      AND status != 'cancelled'
      AND id != ?3
      AND start_minutes < ?4
      AND start_minutes + duration_minutes > ?5";

const APPOINTMENT_INSERT_SQL: &str = "INSERT INTO appointments (
        id, tenant_id, client_id, service_id, service_name, date, start_time, start_minutes,
        duration_minutes, price, status, google_event_id, is_synced_to_google, messages_sent,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)";

const APPOINTMENT_UPDATE_SQL: &str = "UPDATE appointments SET
        client_id = ?3, service_id = ?4, service_name = ?5, date = ?6, start_time = ?7,
        start_minutes = ?8, duration_minutes = ?9, price = ?10, status = ?11,
        google_event_id = ?12, is_synced_to_google = ?13, messages_sent = ?14, updated_at = ?15
    WHERE tenant_id = ?1 AND id = ?2";

const APPOINTMENT_GET_SQL: &str = "SELECT id, tenant_id, client_id, service_id, service_name,
        date, start_time, duration_minutes, price, status, google_event_id, is_synced_to_google,
        messages_sent, created_at, updated_at
    FROM appointments
    WHERE tenant_id = ?1 AND id = ?2";

const APPOINTMENT_BY_DATE_SQL: &str = "SELECT id, tenant_id, client_id, service_id, service_name,
        date, start_time, duration_minutes, price, status, google_event_id, is_synced_to_google,
        messages_sent, created_at, updated_at
    FROM appointments
    WHERE tenant_id = ?1 AND date = ?2
    ORDER BY start_minutes ASC";

const APPOINTMENT_IN_RANGE_SQL: &str = "SELECT id, tenant_id, client_id, service_id, service_name,
        date, start_time, duration_minutes, price, status, google_event_id, is_synced_to_google,
        messages_sent, created_at, updated_at
    FROM appointments
    WHERE tenant_id = ?1 AND date >= ?2 AND date <= ?3
    ORDER BY date ASC, start_minutes ASC";

const APPOINTMENT_SLOT_WINDOW_SQL: &str = "SELECT id, tenant_id, client_id, service_id,
        service_name, date, start_time, duration_minutes, price, status, google_event_id,
        is_synced_to_google, messages_sent, created_at, updated_at
    FROM appointments
    WHERE (date || ' ' || start_time) >= ?1 AND (date || ' ' || start_time) < ?2
    ORDER BY date ASC, start_minutes ASC";

fn map_appointment_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let id_raw: String = row.get(0)?;
    let status_raw: String = row.get(9)?;
    let flags_raw: String = row.get(12)?;
    let date_raw: String = row.get(5)?;
    let time_raw: String = row.get(6)?;
    let duration: i64 = row.get(7)?;

    Ok(Appointment {
        id: parse_uuid(0, &id_raw)?,
        tenant_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        client_id: parse_uuid(2, &row.get::<_, String>(2)?)?,
        service_id: parse_uuid(3, &row.get::<_, String>(3)?)?,
        service_name: row.get(4)?,
        date: parse_date(5, &date_raw)?,
        start_time: parse_time(6, &time_raw)?,
        duration_minutes: u32::try_from(duration).unwrap_or_default(),
        price: row.get(8)?,
        status: parse_status(&id_raw, &status_raw),
        google_event_id: row.get(10)?,
        is_synced_to_google: int_to_bool(row.get(11)?),
        messages_sent: parse_flags(&id_raw, &flags_raw),
        created_at: datetime_from_secs(row.get(13)?),
        updated_at: datetime_from_secs(row.get(14)?),
    })
}

fn parse_status(id: &str, raw: &str) -> AppointmentStatus {
    match raw.parse::<AppointmentStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(
                appointment_id = %id,
                raw_status = %raw,
                error = %err,
                "invalid appointment status in database, defaulting to pending"
            );
            AppointmentStatus::Pending
        }
    }
}

fn parse_flags(id: &str, raw: &str) -> MessagesSent {
    match serde_json::from_str(raw) {
        Ok(flags) => flags,
        Err(err) => {
            warn!(
                appointment_id = %id,
                error = %err,
                "invalid messages_sent payload in database, defaulting to unsent"
            );
            MessagesSent::default()
        }
    }
}

fn encode_flags(flags: &MessagesSent) -> DomainResult<String> {
    serde_json::to_string(flags)
        .map_err(|e| AgendaError::Internal(format!("failed to encode messages_sent: {e}")))
}

fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn datetime_from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64) -> bool {
    value != 0
}

fn map_sql_error(err: rusqlite::Error) -> AgendaError {
    AgendaError::from(InfraError::from(err))
}

fn map_join_error(err: task::JoinError) -> AgendaError {
    if err.is_cancelled() {
        AgendaError::Internal("appointment task cancelled".into())
    } else {
        AgendaError::Internal(format!("appointment task panic: {err}"))
    }
}
