pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod import;
pub mod pricing;

pub use domain::catalog::{Brand, BrandId, DeviceModel, DeviceModelId, PartType, PartTypeId};
pub use domain::history::{
    HistoryId, HistoryMetadata, HistoryRecord, HistoryStatus, NewHistoryRecord,
};
pub use domain::service::{ServiceDefinition, ServiceId};
pub use domain::shop::ShopConfig;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use export::{ExportError, ExportFormat};
pub use import::{ImportBatch, ImportError, ImportRejection, ImportReport};
pub use pricing::classifier::{
    classify_module_service, classify_security_unlock_service, KeywordRuleClassifier,
    RuleClassifier, RuleFlags,
};
pub use pricing::validator::ValidationResult;
pub use pricing::{
    quote, CalculationParams, Currency, DeterministicPricingEngine, PriceBreakdown,
    PricingEngine, SecurityTier,
};
