//! SQLite-backed implementation of the service catalog port.

use std::sync::Arc;

use agendapro_core::ServiceCatalogRepository;
use agendapro_domain::{AgendaError, Result as DomainResult, ServiceOffering};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite-backed service catalog.
pub struct SqliteServiceRepository {
    db: Arc<DbManager>,
}

impl SqliteServiceRepository {
    /// Construct a repository backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ServiceCatalogRepository for SqliteServiceRepository {
    async fn insert(&self, service: &ServiceOffering) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_insert = service.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                SERVICE_INSERT_SQL,
                params![
                    to_insert.id.to_string(),
                    to_insert.tenant_id.to_string(),
                    to_insert.name,
                    i64::from(to_insert.duration_minutes),
                    to_insert.price,
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

    async fn update(&self, service: &ServiceOffering) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let to_update = service.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    SERVICE_UPDATE_SQL,
                    params![
                        to_update.tenant_id.to_string(),
                        to_update.id.to_string(),
                        to_update.name,
                        i64::from(to_update.duration_minutes),
                        to_update.price,
                        to_update.updated_at.timestamp(),
                    ],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("service {}", to_update.id)));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> DomainResult<Option<ServiceOffering>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<ServiceOffering>> {
            let conn = db.get_connection()?;
            conn.query_row(
                SERVICE_GET_SQL,
                params![tenant_id.to_string(), id.to_string()],
                map_service_row,
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
                    "DELETE FROM services WHERE tenant_id = ?1 AND id = ?2",
                    params![tenant_id.to_string(), id.to_string()],
                )
                .map_err(map_sql_error)?;

            if changed == 0 {
                return Err(AgendaError::NotFound(format!("service {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list(&self, tenant_id: Uuid) -> DomainResult<Vec<ServiceOffering>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ServiceOffering>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(SERVICE_LIST_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![tenant_id.to_string()], map_service_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

const SERVICE_INSERT_SQL: &str = "INSERT INTO services (
        id, tenant_id, name, duration_minutes, price, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const SERVICE_UPDATE_SQL: &str = "UPDATE services SET name = ?3, duration_minutes = ?4,
        price = ?5, updated_at = ?6
    WHERE tenant_id = ?1 AND id = ?2";

const SERVICE_GET_SQL: &str = "SELECT id, tenant_id, name, duration_minutes, price, created_at,
        updated_at
    FROM services
    WHERE tenant_id = ?1 AND id = ?2";

const SERVICE_LIST_SQL: &str = "SELECT id, tenant_id, name, duration_minutes, price, created_at,
        updated_at
    FROM services
    WHERE tenant_id = ?1
    ORDER BY name COLLATE NOCASE ASC";

fn map_service_row(row: &Row<'_>) -> rusqlite::Result<ServiceOffering> {
    let duration: i64 = row.get(3)?;
    Ok(ServiceOffering {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        duration_minutes: u32::try_from(duration).unwrap_or_default(),
        price: row.get(4)?,
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
        AgendaError::Internal("service catalog task cancelled".into())
    } else {
        AgendaError::Internal(format!("service catalog task panic: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_and_get_round_trips() {
        let (repo, _manager, _temp_dir) = setup_repository().await;
        let service = sample_service(tenant(), "Corte de cabelo", 45, 80.0);

        repo.insert(&service).await.expect("insert succeeds");

        let loaded = repo
            .get(service.tenant_id, service.id)
            .await
            .expect("get succeeds")
            .expect("row found");
        assert_eq!(loaded.name, "Corte de cabelo");
        assert_eq!(loaded.duration_minutes, 45);
        assert_eq!(loaded.price, 80.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_changes_duration_and_price() {
        let (repo, _manager, _temp_dir) = setup_repository().await;
        let mut service = sample_service(tenant(), "Manicure", 30, 50.0);
        repo.insert(&service).await.expect("insert succeeds");

        service.duration_minutes = 40;
        service.price = 55.0;
        repo.update(&service).await.expect("update succeeds");

        let loaded = repo.get(service.tenant_id, service.id).await.unwrap().expect("row found");
        assert_eq!(loaded.duration_minutes, 40);
        assert_eq!(loaded.price, 55.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_missing_returns_not_found() {
        let (repo, _manager, _temp_dir) = setup_repository().await;
        let service = sample_service(tenant(), "Ghost", 30, 10.0);

        let err = repo.update(&service).await.expect_err("missing row fails");
        assert!(matches!(err, AgendaError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_is_scoped_to_tenant() {
        let (repo, _manager, _temp_dir) = setup_repository().await;
        let tenant_id = tenant();

        repo.insert(&sample_service(tenant_id, "Corte", 30, 60.0)).await.unwrap();
        repo.insert(&sample_service(tenant_id, "Barba", 20, 40.0)).await.unwrap();
        repo.insert(&sample_service(tenant(), "Elsewhere", 10, 5.0)).await.unwrap();

        let listed = repo.list(tenant_id).await.expect("list succeeds");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Barba");
        assert_eq!(listed[1].name, "Corte");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_removes_row() {
        let (repo, _manager, _temp_dir) = setup_repository().await;
        let service = sample_service(tenant(), "Corte", 30, 60.0);
        repo.insert(&service).await.unwrap();

        repo.delete(service.tenant_id, service.id).await.expect("delete succeeds");
        assert!(repo.get(service.tenant_id, service.id).await.unwrap().is_none());

        let err =
            repo.delete(service.tenant_id, service.id).await.expect_err("second delete fails");
        assert!(matches!(err, AgendaError::NotFound(_)));
    }

    async fn setup_repository() -> (SqliteServiceRepository, Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("manager created");
        manager.run_migrations().expect("migrations applied");
        let manager = Arc::new(manager);
        let repo = SqliteServiceRepository::new(Arc::clone(&manager));

        (repo, manager, temp_dir)
    }

    fn tenant() -> Uuid {
        Uuid::now_v7()
    }

    fn sample_service(tenant_id: Uuid, name: &str, minutes: u32, price: f64) -> ServiceOffering {
        let now = Utc::now();
        ServiceOffering {
            id: Uuid::now_v7(),
            tenant_id,
            name: name.into(),
            duration_minutes: minutes,
            price,
            created_at: now,
            updated_at: now,
        }
    }
}
