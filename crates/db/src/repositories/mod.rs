use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use plugfix_core::domain::catalog::{Brand, BrandId, DeviceModel, DeviceModelId, PartType, PartTypeId};
use plugfix_core::domain::history::{HistoryId, HistoryMetadata, HistoryRecord, NewHistoryRecord};
use plugfix_core::domain::service::{ServiceDefinition, ServiceId};
use plugfix_core::domain::shop::ShopConfig;
use plugfix_core::errors::{ApplicationError, DomainError};

pub mod catalog;
pub mod history;
pub mod memory;
pub mod service;
pub mod shop_config;

pub use catalog::SqlCatalogRepository;
pub use history::SqlHistoryRepository;
pub use memory::{
    InMemoryCatalogRepository, InMemoryHistoryRepository, InMemoryServiceRepository,
    InMemoryShopConfigRepository,
};
pub use service::SqlServiceRepository;
pub use shop_config::SqlShopConfigRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(error) => Self::Domain(error),
            RepositoryError::NotFound(what) => {
                Self::Domain(DomainError::InvariantViolation(format!("{what} does not exist")))
            }
            other => Self::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ShopConfigRepository: Send + Sync {
    /// `None` until the shop saves its first settings.
    async fn get(&self) -> Result<Option<ShopConfig>, RepositoryError>;
    async fn save(&self, config: ShopConfig) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: &ServiceId)
        -> Result<Option<ServiceDefinition>, RepositoryError>;
    /// Case-insensitive match on the trimmed name.
    async fn find_by_name(&self, name: &str)
        -> Result<Option<ServiceDefinition>, RepositoryError>;
    async fn list(&self) -> Result<Vec<ServiceDefinition>, RepositoryError>;
    async fn save(&self, service: ServiceDefinition) -> Result<(), RepositoryError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: &ServiceId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError>;
    async fn save_brand(&self, brand: Brand) -> Result<(), RepositoryError>;
    /// Removing a brand removes its device models too.
    async fn delete_brand(&self, id: &BrandId) -> Result<bool, RepositoryError>;

    async fn list_models(
        &self,
        brand_id: Option<&BrandId>,
    ) -> Result<Vec<DeviceModel>, RepositoryError>;
    /// Fails with `NotFound` when the model's brand is not stored.
    async fn save_model(&self, model: DeviceModel) -> Result<(), RepositoryError>;
    async fn delete_model(&self, id: &DeviceModelId) -> Result<bool, RepositoryError>;

    async fn list_part_types(&self) -> Result<Vec<PartType>, RepositoryError>;
    async fn save_part_type(&self, part_type: PartType) -> Result<(), RepositoryError>;
    async fn delete_part_type(&self, id: &PartTypeId) -> Result<bool, RepositoryError>;
}

/// Saved quotes. A record's breakdown is written once by `append`.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryId, RepositoryError>;
    async fn find_by_id(&self, id: &HistoryId) -> Result<Option<HistoryRecord>, RepositoryError>;
    /// Newest first; `limit` of `None` returns everything.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryRecord>, RepositoryError>;
    async fn update_metadata(
        &self,
        id: &HistoryId,
        metadata: HistoryMetadata,
    ) -> Result<HistoryRecord, RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn decimal_column(row: &SqliteRow, name: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = column(row, name)?;
    Decimal::from_str(&raw).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
