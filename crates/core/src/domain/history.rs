use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::service::ServiceId;
use crate::errors::DomainError;
use crate::pricing::{Currency, PriceBreakdown};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub String);

impl HistoryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Delivered,
    Cancelled,
}

impl HistoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for HistoryStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(DomainError::UnknownHistoryStatus(other.to_owned())),
        }
    }
}

/// Operator-editable fields of a saved quote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMetadata {
    pub client_name: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: HistoryStatus,
    pub supplier: Option<String>,
}

/// What the caller knows about a quote at the moment it is saved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHistoryRecord {
    pub service_id: Option<ServiceId>,
    pub service_name: String,
    pub brand: Option<String>,
    pub device_model: Option<String>,
    pub part_type: Option<String>,
    pub part_cost: Decimal,
    pub currency: Currency,
    pub breakdown: PriceBreakdown,
    pub metadata: HistoryMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub service_id: Option<ServiceId>,
    pub service_name: String,
    pub brand: Option<String>,
    pub device_model: Option<String>,
    pub part_type: Option<String>,
    pub part_cost: Decimal,
    pub currency: Currency,
    pub breakdown: PriceBreakdown,
    pub metadata: HistoryMetadata,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn from_new(id: HistoryId, record: NewHistoryRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            service_id: record.service_id,
            service_name: record.service_name,
            brand: record.brand,
            device_model: record.device_model,
            part_type: record.part_type,
            part_cost: record.part_cost,
            currency: record.currency,
            breakdown: record.breakdown,
            metadata: record.metadata,
            created_at,
        }
    }

    pub fn can_transition_to(&self, next: HistoryStatus) -> bool {
        self.metadata.status == next
            || matches!(
                (self.metadata.status, next),
                (HistoryStatus::Pending, HistoryStatus::InProgress)
                    | (HistoryStatus::Pending, HistoryStatus::Completed)
                    | (HistoryStatus::InProgress, HistoryStatus::Pending)
                    | (HistoryStatus::InProgress, HistoryStatus::Completed)
                    | (HistoryStatus::Completed, HistoryStatus::InProgress)
                    | (HistoryStatus::Completed, HistoryStatus::Delivered)
                    | (HistoryStatus::Cancelled, HistoryStatus::Pending)
                    | (HistoryStatus::Pending, HistoryStatus::Cancelled)
                    | (HistoryStatus::InProgress, HistoryStatus::Cancelled)
                    | (HistoryStatus::Completed, HistoryStatus::Cancelled)
            )
    }

    /// Replaces the operator metadata. The price breakdown is never touched.
    pub fn update_metadata(&mut self, metadata: HistoryMetadata) -> Result<(), DomainError> {
        if !self.can_transition_to(metadata.status) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.metadata.status,
                to: metadata.status,
            });
        }

        self.metadata = metadata;
        Ok(())
    }
}
