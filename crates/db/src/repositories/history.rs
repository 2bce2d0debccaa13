use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use plugfix_core::domain::history::{
    HistoryId, HistoryMetadata, HistoryRecord, HistoryStatus, NewHistoryRecord,
};
use plugfix_core::domain::service::ServiceId;
use plugfix_core::pricing::{Currency, PriceBreakdown};

use super::{
    column, decimal_column, encode_timestamp, timestamp_column, HistoryRepository,
    RepositoryError,
};
use crate::DbPool;

const SELECT_HISTORY: &str = "SELECT id, service_id, service_name, brand, device_model, part_type,
        part_cost, currency, breakdown_json, client_name, notes, status, supplier, created_at
     FROM quote_history";

pub struct SqlHistoryRepository {
    pool: DbPool,
}

impl SqlHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &SqliteRow) -> Result<HistoryRecord, RepositoryError> {
    let currency: String = column(row, "currency")?;
    let status: String = column(row, "status")?;
    let breakdown_json: String = column(row, "breakdown_json")?;
    let breakdown: PriceBreakdown = serde_json::from_str(&breakdown_json)
        .map_err(|e| RepositoryError::Decode(format!("breakdown_json: {e}")))?;

    Ok(HistoryRecord {
        id: HistoryId(column(row, "id")?),
        service_id: column::<Option<String>>(row, "service_id")?.map(ServiceId),
        service_name: column(row, "service_name")?,
        brand: column(row, "brand")?,
        device_model: column(row, "device_model")?,
        part_type: column(row, "part_type")?,
        part_cost: decimal_column(row, "part_cost")?,
        currency: Currency::from_str(&currency)
            .map_err(|e| RepositoryError::Decode(format!("currency: {e}")))?,
        breakdown,
        metadata: HistoryMetadata {
            client_name: column(row, "client_name")?,
            notes: column(row, "notes")?,
            status: HistoryStatus::from_str(&status)
                .map_err(|e| RepositoryError::Decode(format!("status: {e}")))?,
            supplier: column(row, "supplier")?,
        },
        created_at: timestamp_column(row, "created_at")?,
    })
}

#[async_trait::async_trait]
impl HistoryRepository for SqlHistoryRepository {
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryId, RepositoryError> {
        let id = HistoryId::generate();
        let breakdown_json = serde_json::to_string(&record.breakdown)
            .map_err(|e| RepositoryError::Encode(format!("breakdown: {e}")))?;

        sqlx::query(
            "INSERT INTO quote_history
                (id, service_id, service_name, brand, device_model, part_type, part_cost,
                 currency, breakdown_json, client_name, notes, status, supplier, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&id.0)
        .bind(record.service_id.as_ref().map(|service_id| service_id.0.as_str()))
        .bind(&record.service_name)
        .bind(&record.brand)
        .bind(&record.device_model)
        .bind(&record.part_type)
        .bind(record.part_cost.to_string())
        .bind(record.currency.as_str())
        .bind(breakdown_json)
        .bind(&record.metadata.client_name)
        .bind(&record.metadata.notes)
        .bind(record.metadata.status.as_str())
        .bind(&record.metadata.supplier)
        .bind(encode_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        tracing::info!(
            event_name = "db.history.appended",
            history_id = %id.0,
            service_name = %record.service_name,
            final_price_local = %record.breakdown.final_price_local,
            "quote saved to history"
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: &HistoryId) -> Result<Option<HistoryRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_HISTORY} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryRecord>, RepositoryError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let rows = sqlx::query(&format!(
            "{SELECT_HISTORY} ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn update_metadata(
        &self,
        id: &HistoryId,
        metadata: HistoryMetadata,
    ) -> Result<HistoryRecord, RepositoryError> {
        let mut record = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("history {}", id.0)))?;
        let previous = record.metadata.status;
        record.update_metadata(metadata)?;

        sqlx::query(
            "UPDATE quote_history
             SET client_name = ?1, notes = ?2, status = ?3, supplier = ?4
             WHERE id = ?5",
        )
        .bind(&record.metadata.client_name)
        .bind(&record.metadata.notes)
        .bind(record.metadata.status.as_str())
        .bind(&record.metadata.supplier)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            event_name = "db.history.metadata_updated",
            history_id = %id.0,
            from_status = previous.as_str(),
            to_status = record.metadata.status.as_str(),
            "history metadata updated"
        );
        Ok(record)
    }
}
