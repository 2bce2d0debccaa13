use serde_json::{json, Value};
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_BRAND_IDS: &[&str] = &["samsung", "motorola", "apple", "xiaomi"];
const SEED_MODEL_COUNT: i64 = 8;
const SEED_PART_TYPE_IDS: &[&str] =
    &["pantalla", "modulo", "bateria", "pin-de-carga", "camara-trasera"];
const SEED_SERVICE_IDS: &[&str] = &[
    "cambio-de-pantalla",
    "cambio-de-modulo",
    "cambio-de-bateria",
    "pin-de-carga",
    "desbloqueo-frp",
    "cuenta-de-google",
    "diagnostico",
];

/// Demo brands, models, part types and services.
///
/// Loading is idempotent: rows that already exist are left as they are, so an
/// operator's edits to a seeded service survive a second `seed`.
pub struct CatalogSeedDataset;

impl CatalogSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/catalog_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        let inserted = tx.execute(sqlx::query(Self::SQL)).await?.rows_affected();
        tx.commit().await?;

        tracing::info!(event_name = "db.seed.loaded", rows_inserted = inserted, "catalog seeded");

        Ok(SeedResult {
            rows_inserted: inserted,
            brands: SEED_BRAND_IDS.len(),
            part_types: SEED_PART_TYPE_IDS.len(),
            services: SEED_SERVICE_IDS.len(),
        })
    }

    /// Checks that every seeded row is present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        checks.push(("brands", count_ids(pool, "brand", SEED_BRAND_IDS).await?));
        checks.push(("part-types", count_ids(pool, "part_type", SEED_PART_TYPE_IDS).await?));
        checks.push(("services", count_ids(pool, "service_definition", SEED_SERVICE_IDS).await?));

        let brands = sql_array_from_ids(SEED_BRAND_IDS);
        let model_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM device_model WHERE brand_id IN {brands}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("device-models", model_count >= SEED_MODEL_COUNT));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

async fn count_ids(pool: &DbPool, table: &str, ids: &[&str]) -> Result<bool, RepositoryError> {
    let quoted = sql_array_from_ids(ids);
    let count: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id IN {quoted}"))
            .fetch_one(pool)
            .await?;
    Ok(usize::try_from(count).map_or(false, |count| count == ids.len()))
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect::<Vec<_>>();
    format!("({})", quoted.join(", "))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub rows_inserted: u64,
    pub brands: usize,
    pub part_types: usize,
    pub services: usize,
}

impl SeedResult {
    pub fn to_json(&self) -> Value {
        json!({
            "rows_inserted": self.rows_inserted,
            "brands": self.brands,
            "part_types": self.part_types,
            "services": self.services,
        })
    }
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks.iter().filter(|(_, ok)| !ok).map(|(name, _)| *name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::CatalogSeedDataset;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::{
        CatalogRepository, ServiceRepository, SqlCatalogRepository, SqlServiceRepository,
    };

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        let result = CatalogSeedDataset::load(&pool).await.expect("seed");
        assert!(result.rows_inserted > 0);

        let verification = CatalogSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed: {:?}", verification.failed_checks());

        let services = SqlServiceRepository::new(pool.clone());
        let frp = services.find_by_name("desbloqueo frp").await.expect("find").expect("seeded");
        assert!(frp.is_security_unlock_service());

        let catalog = SqlCatalogRepository::new(pool);
        assert_eq!(catalog.list_brands().await.expect("brands").len(), 4);
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        CatalogSeedDataset::load(&pool).await.expect("first seed");
        let second = CatalogSeedDataset::load(&pool).await.expect("second seed");

        assert_eq!(second.rows_inserted, 0);
        let services = SqlServiceRepository::new(pool);
        assert_eq!(services.list().await.expect("list").len(), 7);
    }

    #[tokio::test]
    async fn verify_reports_missing_rows_on_empty_database() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        let verification = CatalogSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert!(verification.failed_checks().contains(&"services"));
    }
}
