use plugfix_core::domain::service::{ServiceDefinition, ServiceId};

use super::{column, decimal_column, RepositoryError, ServiceRepository};
use crate::DbPool;

pub struct SqlServiceRepository {
    pool: DbPool,
}

impl SqlServiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_service(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceDefinition, RepositoryError> {
    Ok(ServiceDefinition {
        id: ServiceId(column(row, "id")?),
        name: column(row, "name")?,
        base_price: decimal_column(row, "base_price")?,
    })
}

#[async_trait::async_trait]
impl ServiceRepository for SqlServiceRepository {
    async fn find_by_id(
        &self,
        id: &ServiceId,
    ) -> Result<Option<ServiceDefinition>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, base_price FROM service_definition WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_service).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ServiceDefinition>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, base_price FROM service_definition
             WHERE lower(trim(name)) = lower(trim(?1))
             ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_service).transpose()
    }

    async fn list(&self) -> Result<Vec<ServiceDefinition>, RepositoryError> {
        let rows =
            sqlx::query("SELECT id, name, base_price FROM service_definition ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_service).collect()
    }

    async fn save(&self, service: ServiceDefinition) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO service_definition (id, name, base_price) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, base_price = excluded.base_price",
        )
        .bind(&service.id.0)
        .bind(&service.name)
        .bind(service.base_price.to_string())
        .execute(&self.pool)
        .await?;

        tracing::info!(
            event_name = "db.service.saved",
            service_id = %service.id.0,
            base_price = %service.base_price,
            "service definition saved"
        );
        Ok(())
    }

    async fn delete(&self, id: &ServiceId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM service_definition WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
