use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::history::HistoryRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ExportError::UnsupportedFormat(other.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format `{0}` (expected csv|json)")]
    UnsupportedFormat(String),
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("export buffer could not be finalized: {0}")]
    Buffer(String),
}

/// One flat spreadsheet row per saved quote.
#[derive(Debug, Serialize)]
struct HistoryCsvRow<'a> {
    id: &'a str,
    created_at: String,
    service_name: &'a str,
    brand: Option<&'a str>,
    device_model: Option<&'a str>,
    part_type: Option<&'a str>,
    part_cost: Decimal,
    currency: &'static str,
    part_cost_local: Decimal,
    labor_cost_local: Decimal,
    margin_local: Decimal,
    subtotal_local: Decimal,
    final_price_local: Decimal,
    final_price_usd: Decimal,
    rule: &'static str,
    status: &'static str,
    client_name: Option<&'a str>,
    supplier: Option<&'a str>,
    notes: Option<&'a str>,
}

impl<'a> From<&'a HistoryRecord> for HistoryCsvRow<'a> {
    fn from(record: &'a HistoryRecord) -> Self {
        Self {
            id: &record.id.0,
            created_at: record.created_at.to_rfc3339(),
            service_name: &record.service_name,
            brand: record.brand.as_deref(),
            device_model: record.device_model.as_deref(),
            part_type: record.part_type.as_deref(),
            part_cost: record.part_cost,
            currency: record.currency.as_str(),
            part_cost_local: record.breakdown.part_cost_local,
            labor_cost_local: record.breakdown.labor_cost_local,
            margin_local: record.breakdown.margin_local,
            subtotal_local: record.breakdown.subtotal_local,
            final_price_local: record.breakdown.final_price_local,
            final_price_usd: record.breakdown.final_price_usd,
            rule: record.breakdown.rule_label(),
            status: record.metadata.status.as_str(),
            client_name: record.metadata.client_name.as_deref(),
            supplier: record.metadata.supplier.as_deref(),
            notes: record.metadata.notes.as_deref(),
        }
    }
}

pub fn export_history(
    records: &[HistoryRecord],
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => history_to_csv(records),
        ExportFormat::Json => history_to_json(records),
    }
}

pub fn history_to_csv(records: &[HistoryRecord]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(HistoryCsvRow::from(record))?;
    }

    let bytes = writer.into_inner().map_err(|error| ExportError::Buffer(error.to_string()))?;
    String::from_utf8(bytes).map_err(|error| ExportError::Buffer(error.to_string()))
}

pub fn history_to_json(records: &[HistoryRecord]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(records)?)
}
