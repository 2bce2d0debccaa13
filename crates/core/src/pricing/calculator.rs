use rust_decimal::{Decimal, RoundingStrategy};

use super::{CalculationParams, Currency, PriceBreakdown};

const THOUSAND: Decimal = Decimal::ONE_THOUSAND;
const TWO: Decimal = Decimal::TWO;
const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;
/// 10% safety margin on top of the doubled part cost for module repairs.
const MODULE_SAFETY_FACTOR: Decimal = Decimal::from_parts(110, 0, 0, false, 2);

/// Line items before display rounding.
struct Lines {
    part_cost: Decimal,
    labor_cost: Decimal,
    subtotal: Decimal,
    margin: Decimal,
    final_price: Decimal,
    used_module_rule: bool,
    used_security_unlock_rule: bool,
}

/// Computes the price breakdown for already-validated params.
///
/// Formulas are tried in a fixed order: module repair, then security unlock, then
/// the standard margin formula. A name that qualifies for both special rules is
/// priced as a module repair.
///
/// Never panics. If an amount would overflow `Decimal`, every money line comes
/// back as zero with the rule flags kept; `validate` rejects inputs that large.
pub fn calculate(params: &CalculationParams) -> PriceBreakdown {
    let lines = price_lines(params).unwrap_or_else(|| Lines::overflowed(params));
    finish(lines, params.usd_rate)
}

fn price_lines(params: &CalculationParams) -> Option<Lines> {
    let part_cost_local = part_cost_in_local(params)?;
    let effective_labor = effective_labor(params);

    if params.is_module_service {
        module_repair(part_cost_local, effective_labor)
    } else if params.is_security_unlock_service {
        security_unlock(effective_labor, params.security_tier.multiplier())
    } else {
        standard(part_cost_local, effective_labor, params.default_margin)
    }
}

/// Rounds `amount` up to the next multiple of 1000; exact multiples stay put.
pub fn ceil_to_thousand(amount: Decimal) -> Decimal {
    checked_ceil_to_thousand(amount).unwrap_or(Decimal::ZERO)
}

fn checked_ceil_to_thousand(amount: Decimal) -> Option<Decimal> {
    amount.checked_div(THOUSAND)?.ceil().checked_mul(THOUSAND)
}

/// Part cost converted into local currency, `None` on overflow.
pub fn part_cost_in_local(params: &CalculationParams) -> Option<Decimal> {
    match params.currency {
        Currency::Usd => params.part_cost.checked_mul(params.usd_rate),
        Currency::Local => Some(params.part_cost),
    }
}

fn effective_labor(params: &CalculationParams) -> Decimal {
    if params.service_base_price > Decimal::ZERO {
        params.service_base_price
    } else {
        params.minimum_labor_cost
    }
}

impl Lines {
    fn overflowed(params: &CalculationParams) -> Self {
        let used_module_rule = params.is_module_service;
        Self {
            part_cost: Decimal::ZERO,
            labor_cost: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            margin: Decimal::ZERO,
            final_price: Decimal::ZERO,
            used_module_rule,
            used_security_unlock_rule: !used_module_rule && params.is_security_unlock_service,
        }
    }
}

fn module_repair(part_cost: Decimal, effective_labor: Decimal) -> Option<Lines> {
    let suggested_price = part_cost.checked_mul(TWO)?.checked_mul(MODULE_SAFETY_FACTOR)?;
    let resulting_gain = suggested_price.checked_sub(part_cost)?;

    if resulting_gain > effective_labor {
        return Some(Lines {
            part_cost,
            labor_cost: resulting_gain,
            subtotal: suggested_price,
            margin: Decimal::ZERO,
            final_price: checked_ceil_to_thousand(suggested_price)?,
            used_module_rule: true,
            used_security_unlock_rule: false,
        });
    }

    // gain does not beat the flat labor floor: charge part + labor instead
    let subtotal = part_cost.checked_add(effective_labor)?;
    Some(Lines {
        part_cost,
        labor_cost: effective_labor,
        subtotal,
        margin: Decimal::ZERO,
        final_price: checked_ceil_to_thousand(subtotal)?,
        used_module_rule: false,
        used_security_unlock_rule: false,
    })
}

fn security_unlock(effective_labor: Decimal, multiplier: Decimal) -> Option<Lines> {
    let total = effective_labor.checked_mul(multiplier)?;
    Some(Lines {
        part_cost: Decimal::ZERO,
        labor_cost: total,
        subtotal: total,
        margin: Decimal::ZERO,
        final_price: checked_ceil_to_thousand(total)?,
        used_module_rule: false,
        used_security_unlock_rule: true,
    })
}

fn standard(part_cost: Decimal, effective_labor: Decimal, margin_pct: Decimal) -> Option<Lines> {
    let margin = part_cost.checked_mul(margin_pct.checked_div(ONE_HUNDRED)?)?;
    let subtotal = part_cost.checked_add(margin)?.checked_add(effective_labor)?;
    Some(Lines {
        part_cost,
        labor_cost: effective_labor,
        subtotal,
        margin,
        final_price: checked_ceil_to_thousand(subtotal)?,
        used_module_rule: false,
        used_security_unlock_rule: false,
    })
}

fn finish(lines: Lines, usd_rate: Decimal) -> PriceBreakdown {
    let final_price_usd = if usd_rate > Decimal::ZERO {
        lines
            .final_price
            .checked_div(usd_rate)
            .map(|usd| usd.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
            .unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    PriceBreakdown {
        part_cost_local: whole(lines.part_cost),
        labor_cost_local: whole(lines.labor_cost),
        risk_premium_local: Decimal::ZERO,
        subtotal_local: whole(lines.subtotal),
        margin_local: whole(lines.margin),
        final_price_local: whole(lines.final_price),
        final_price_usd,
        used_module_rule: lines.used_module_rule,
        used_security_unlock_rule: lines.used_security_unlock_rule,
    }
}

fn whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).normalize()
}
