use plugfix_core::domain::catalog::{
    Brand, BrandId, DeviceModel, DeviceModelId, PartType, PartTypeId,
};

use super::{column, CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn delete_by_id(&self, sql: &str, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name FROM brand ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<Brand, RepositoryError> {
                Ok(Brand { id: BrandId(column(row, "id")?), name: column(row, "name")? })
            })
            .collect()
    }

    async fn save_brand(&self, brand: Brand) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO brand (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&brand.id.0)
        .bind(&brand.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_brand(&self, id: &BrandId) -> Result<bool, RepositoryError> {
        self.delete_by_id("DELETE FROM brand WHERE id = ?1", &id.0).await
    }

    async fn list_models(
        &self,
        brand_id: Option<&BrandId>,
    ) -> Result<Vec<DeviceModel>, RepositoryError> {
        let rows = match brand_id {
            Some(brand_id) => {
                sqlx::query(
                    "SELECT id, brand_id, name FROM device_model
                     WHERE brand_id = ?1 ORDER BY name, id",
                )
                .bind(&brand_id.0)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, brand_id, name FROM device_model ORDER BY brand_id, name, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|row| -> Result<DeviceModel, RepositoryError> {
                Ok(DeviceModel {
                    id: DeviceModelId(column(row, "id")?),
                    brand_id: BrandId(column(row, "brand_id")?),
                    name: column(row, "name")?,
                })
            })
            .collect()
    }

    async fn save_model(&self, model: DeviceModel) -> Result<(), RepositoryError> {
        let brand_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM brand WHERE id = ?1)")
            .bind(&model.brand_id.0)
            .fetch_one(&self.pool)
            .await?;
        if brand_exists == 0 {
            return Err(RepositoryError::NotFound(format!("brand {}", model.brand_id.0)));
        }

        sqlx::query(
            "INSERT INTO device_model (id, brand_id, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET brand_id = excluded.brand_id, name = excluded.name",
        )
        .bind(&model.id.0)
        .bind(&model.brand_id.0)
        .bind(&model.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_model(&self, id: &DeviceModelId) -> Result<bool, RepositoryError> {
        self.delete_by_id("DELETE FROM device_model WHERE id = ?1", &id.0).await
    }

    async fn list_part_types(&self) -> Result<Vec<PartType>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name FROM part_type ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<PartType, RepositoryError> {
                Ok(PartType { id: PartTypeId(column(row, "id")?), name: column(row, "name")? })
            })
            .collect()
    }

    async fn save_part_type(&self, part_type: PartType) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO part_type (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&part_type.id.0)
        .bind(&part_type.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_part_type(&self, id: &PartTypeId) -> Result<bool, RepositoryError> {
        self.delete_by_id("DELETE FROM part_type WHERE id = ?1", &id.0).await
    }
}
