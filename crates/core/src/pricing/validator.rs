use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calculator::part_cost_in_local;
use super::CalculationParams;

const MAX_MARGIN_PCT: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
/// Largest local-currency amount accepted for any input line (10^15).
const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self { valid: true, errors: Vec::new() }
    }
}

/// Checks every input range and collects all failures; never short-circuits.
pub fn validate(params: &CalculationParams) -> ValidationResult {
    let mut result = ValidationResult::default();

    if params.part_cost < Decimal::ZERO {
        result.errors.push("Part cost cannot be negative".to_string());
    }

    if params.usd_rate <= Decimal::ZERO {
        result.errors.push("USD rate must be greater than zero".to_string());
    }

    if params.part_cost >= Decimal::ZERO && params.usd_rate > Decimal::ZERO {
        let within_range =
            part_cost_in_local(params).is_some_and(|local| local <= MAX_AMOUNT);
        if !within_range {
            result.errors.push("Part cost is too large for the configured USD rate".to_string());
        }
    }

    if params.default_margin < Decimal::ZERO || params.default_margin > MAX_MARGIN_PCT {
        result.errors.push("Default margin must be between 0% and 500%".to_string());
    }

    if params.minimum_labor_cost < Decimal::ZERO {
        result.errors.push("Minimum labor cost cannot be negative".to_string());
    } else if params.minimum_labor_cost > MAX_AMOUNT {
        result.errors.push("Minimum labor cost is too large".to_string());
    }

    if params.service_base_price < Decimal::ZERO {
        result.errors.push("Service base price cannot be negative".to_string());
    } else if params.service_base_price > MAX_AMOUNT {
        result.errors.push("Service base price is too large".to_string());
    }

    if !result.errors.is_empty() {
        result.valid = false;
    }

    result
}
