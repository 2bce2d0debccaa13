use chrono::Utc;

use plugfix_core::domain::shop::ShopConfig;

use super::{column, decimal_column, encode_timestamp, RepositoryError, ShopConfigRepository};
use crate::DbPool;

/// The settings table holds at most one row, keyed `id = 1`.
pub struct SqlShopConfigRepository {
    pool: DbPool,
}

impl SqlShopConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ShopConfigRepository for SqlShopConfigRepository {
    async fn get(&self) -> Result<Option<ShopConfig>, RepositoryError> {
        let row = sqlx::query(
            "SELECT usd_rate, default_margin, minimum_labor_cost, apply_module_repair_rule
             FROM shop_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<ShopConfig, RepositoryError> {
            Ok(ShopConfig {
                usd_rate: decimal_column(&row, "usd_rate")?,
                default_margin: decimal_column(&row, "default_margin")?,
                minimum_labor_cost: decimal_column(&row, "minimum_labor_cost")?,
                apply_module_repair_rule: column(&row, "apply_module_repair_rule")?,
            })
        })
        .transpose()
    }

    async fn save(&self, config: ShopConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO shop_config
                (id, usd_rate, default_margin, minimum_labor_cost, apply_module_repair_rule, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                usd_rate = excluded.usd_rate,
                default_margin = excluded.default_margin,
                minimum_labor_cost = excluded.minimum_labor_cost,
                apply_module_repair_rule = excluded.apply_module_repair_rule,
                updated_at = excluded.updated_at",
        )
        .bind(config.usd_rate.to_string())
        .bind(config.default_margin.to_string())
        .bind(config.minimum_labor_cost.to_string())
        .bind(config.apply_module_repair_rule)
        .bind(encode_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        tracing::info!(
            event_name = "db.shop_config.saved",
            usd_rate = %config.usd_rate,
            default_margin = %config.default_margin,
            "shop settings saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use plugfix_core::domain::shop::ShopConfig;

    use super::SqlShopConfigRepository;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::ShopConfigRepository;

    #[tokio::test]
    async fn empty_table_reads_as_none_then_upserts() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        let repo = SqlShopConfigRepository::new(pool.clone());

        assert_eq!(repo.get().await.expect("get"), None);

        let mut config = ShopConfig::default();
        repo.save(config.clone()).await.expect("first save");

        config.usd_rate = Decimal::new(14255, 1);
        config.apply_module_repair_rule = false;
        repo.save(config.clone()).await.expect("second save");

        assert_eq!(repo.get().await.expect("get"), Some(config));
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop_config")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(rows, 1);
    }
}
