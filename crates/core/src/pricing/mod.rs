pub mod calculator;
pub mod classifier;
pub mod validator;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceDefinition;
use crate::domain::shop::ShopConfig;
use crate::errors::DomainError;

use self::classifier::{KeywordRuleClassifier, RuleClassifier, RuleFlags};
use self::validator::ValidationResult;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    #[default]
    Local,
    Usd,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Usd => "usd",
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "ars" => Ok(Self::Local),
            "usd" => Ok(Self::Usd),
            other => Err(DomainError::InvariantViolation(format!(
                "unsupported currency `{other}` (expected local|ars|usd)"
            ))),
        }
    }
}

/// Risk multiplier for account-unlock work, by device security level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecurityTier {
    #[default]
    Standard,
    Elevated,
    Maximum,
}

impl SecurityTier {
    pub fn multiplier(self) -> Decimal {
        Decimal::from(u8::from(self))
    }
}

impl From<SecurityTier> for u8 {
    fn from(tier: SecurityTier) -> Self {
        match tier {
            SecurityTier::Standard => 1,
            SecurityTier::Elevated => 2,
            SecurityTier::Maximum => 3,
        }
    }
}

impl TryFrom<u8> for SecurityTier {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Standard),
            2 => Ok(Self::Elevated),
            3 => Ok(Self::Maximum),
            other => Err(DomainError::InvariantViolation(format!(
                "security tier must be 1, 2 or 3 (got {other})"
            ))),
        }
    }
}

/// Everything one quote calculation needs, already merged from shop settings,
/// service definition and classifier output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationParams {
    pub part_cost: Decimal,
    pub currency: Currency,
    pub usd_rate: Decimal,
    pub default_margin: Decimal,
    pub minimum_labor_cost: Decimal,
    pub service_base_price: Decimal,
    pub is_module_service: bool,
    pub is_security_unlock_service: bool,
    #[serde(default)]
    pub security_tier: SecurityTier,
}

impl CalculationParams {
    /// The module formula is only armed when the shop has the module rule enabled.
    pub fn from_shop(
        shop: &ShopConfig,
        part_cost: Decimal,
        currency: Currency,
        service_base_price: Decimal,
        flags: RuleFlags,
        security_tier: SecurityTier,
    ) -> Self {
        Self {
            part_cost,
            currency,
            usd_rate: shop.usd_rate,
            default_margin: shop.default_margin,
            minimum_labor_cost: shop.minimum_labor_cost,
            service_base_price,
            is_module_service: shop.apply_module_repair_rule && flags.is_module_service,
            is_security_unlock_service: flags.is_security_unlock_service,
            security_tier,
        }
    }

    pub fn for_service(
        shop: &ShopConfig,
        service: &ServiceDefinition,
        part_cost: Decimal,
        currency: Currency,
        security_tier: SecurityTier,
    ) -> Self {
        Self::from_shop(
            shop,
            part_cost,
            currency,
            service.base_price,
            KeywordRuleClassifier.classify(&service.name),
            security_tier,
        )
    }
}

/// Quote output. Immutable once produced; history records store it verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub part_cost_local: Decimal,
    pub labor_cost_local: Decimal,
    pub risk_premium_local: Decimal,
    pub subtotal_local: Decimal,
    pub margin_local: Decimal,
    /// Always a non-negative multiple of 1000.
    pub final_price_local: Decimal,
    pub final_price_usd: Decimal,
    pub used_module_rule: bool,
    pub used_security_unlock_rule: bool,
}

impl PriceBreakdown {
    pub fn rule_label(&self) -> &'static str {
        if self.used_module_rule {
            "module_repair"
        } else if self.used_security_unlock_rule {
            "security_unlock"
        } else {
            "standard"
        }
    }
}

pub trait PricingEngine: Send + Sync {
    fn validate(&self, params: &CalculationParams) -> ValidationResult;
    fn calculate(&self, params: &CalculationParams) -> PriceBreakdown;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn validate(&self, params: &CalculationParams) -> ValidationResult {
        validator::validate(params)
    }

    fn calculate(&self, params: &CalculationParams) -> PriceBreakdown {
        calculator::calculate(params)
    }
}

/// Validates then calculates. The only entry point callers outside the engine
/// should use, so `calculate` never sees out-of-range input.
pub fn quote<E>(engine: &E, params: &CalculationParams) -> Result<PriceBreakdown, DomainError>
where
    E: PricingEngine + ?Sized,
{
    let validation = engine.validate(params);
    if !validation.valid {
        return Err(DomainError::InvalidParameters(validation.errors));
    }

    Ok(engine.calculate(params))
}
