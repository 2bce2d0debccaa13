use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::pricing::classifier::RuleFlags;
use crate::pricing::{validator, CalculationParams, Currency, SecurityTier};

/// Shop-level pricing settings.
///
/// Handed to the pricing engine as a value snapshot for every quote; editing the
/// settings never affects a calculation that is already in flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Local currency units per USD.
    pub usd_rate: Decimal,
    /// Percentage markup applied to the part cost by the standard formula.
    pub default_margin: Decimal,
    /// Labor charged when a service has no base price of its own.
    pub minimum_labor_cost: Decimal,
    pub apply_module_repair_rule: bool,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            usd_rate: Decimal::from(1200),
            default_margin: Decimal::from(40),
            minimum_labor_cost: Decimal::from(13_000),
            apply_module_repair_rule: true,
        }
    }
}

impl ShopConfig {
    /// Rejects settings that would make every quote fail validation.
    pub fn validate(&self) -> Result<(), DomainError> {
        let probe = CalculationParams::from_shop(
            self,
            Decimal::ZERO,
            Currency::Local,
            Decimal::ZERO,
            RuleFlags::default(),
            SecurityTier::default(),
        );
        let result = validator::validate(&probe);
        if result.valid {
            Ok(())
        } else {
            Err(DomainError::InvalidParameters(result.errors))
        }
    }
}
