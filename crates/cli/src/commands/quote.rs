use clap::Args;
use plugfix_core::config::LoadOptions;
use plugfix_core::domain::history::{HistoryMetadata, NewHistoryRecord};
use plugfix_core::domain::service::{ServiceDefinition, ServiceId};
use plugfix_core::domain::shop::ShopConfig;
use plugfix_core::errors::DomainError;
use plugfix_core::pricing::{
    quote, CalculationParams, Currency, DeterministicPricingEngine, SecurityTier,
};
use plugfix_db::repositories::{
    HistoryRepository, ServiceRepository, SqlHistoryRepository, SqlServiceRepository,
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::settings::effective_settings;
use crate::commands::{to_json_value, with_database, CommandOutput, CommandResult};

/// Id given to services typed on the command line; never written to history.
const AD_HOC_SERVICE_ID: &str = "ad-hoc";

#[derive(Debug, Default, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Stored service id or name")]
    pub service: Option<String>,
    #[arg(long, help = "Ad-hoc service name when no stored service is used")]
    pub name: Option<String>,
    #[arg(long, help = "Service base price; overrides the stored one")]
    pub base_price: Option<Decimal>,
    #[arg(long, default_value_t = Decimal::ZERO, help = "Part cost in --currency")]
    pub part_cost: Decimal,
    #[arg(long, default_value = "local", help = "Currency of the part cost (local|usd)")]
    pub currency: Currency,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub security_tier: u8,
    #[arg(long, help = "Use this USD rate for this quote only")]
    pub usd_rate: Option<Decimal>,
    #[arg(long, help = "Use this margin for this quote only")]
    pub margin: Option<Decimal>,
    #[arg(long, help = "Use this minimum labor for this quote only")]
    pub min_labor: Option<Decimal>,
    #[arg(long)]
    pub brand: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub part_type: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub supplier: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, help = "Save the quote to history")]
    pub save: bool,
}

impl QuoteArgs {
    /// Per-quote overrides on top of the shop settings.
    fn shop_snapshot(&self, mut shop: ShopConfig) -> ShopConfig {
        if let Some(usd_rate) = self.usd_rate {
            shop.usd_rate = usd_rate;
        }
        if let Some(margin) = self.margin {
            shop.default_margin = margin;
        }
        if let Some(min_labor) = self.min_labor {
            shop.minimum_labor_cost = min_labor;
        }
        shop
    }

    fn metadata(&self) -> HistoryMetadata {
        HistoryMetadata {
            client_name: self.client.clone(),
            notes: self.notes.clone(),
            status: Default::default(),
            supplier: self.supplier.clone(),
        }
    }
}

/// Picks the service for a quote: a stored one when `stored` is given,
/// otherwise an ad-hoc definition from `--name`.
pub fn resolve_service(
    args: &QuoteArgs,
    stored: Option<ServiceDefinition>,
) -> Result<ServiceDefinition, DomainError> {
    let mut service = match (stored, args.service.as_deref(), args.name.as_deref()) {
        (Some(service), _, _) => service,
        (None, Some(reference), _) => {
            return Err(DomainError::InvariantViolation(format!(
                "no stored service matches `{reference}`"
            )))
        }
        (None, None, Some(name)) if !name.trim().is_empty() => {
            ServiceDefinition::new(AD_HOC_SERVICE_ID, name.trim(), Decimal::ZERO)
        }
        (None, None, _) => {
            return Err(DomainError::InvariantViolation(
                "a quote needs --service or --name".to_owned(),
            ))
        }
    };

    if let Some(base_price) = args.base_price {
        service.base_price = base_price;
    }
    Ok(service)
}

pub fn build_params(
    args: &QuoteArgs,
    shop: ShopConfig,
    service: &ServiceDefinition,
) -> Result<CalculationParams, DomainError> {
    let tier = SecurityTier::try_from(args.security_tier)?;
    Ok(CalculationParams::for_service(
        &args.shop_snapshot(shop),
        service,
        args.part_cost,
        args.currency,
        tier,
    ))
}

pub fn run(options: &LoadOptions, args: QuoteArgs) -> CommandResult {
    with_database("quote", options, |context| async move {
        let services = SqlServiceRepository::new(context.pool.clone());
        let stored = match args.service.as_deref() {
            Some(reference) => match services.find_by_id(&ServiceId(reference.to_owned())).await? {
                Some(service) => Some(service),
                None => services.find_by_name(reference).await?,
            },
            None => None,
        };
        let service = resolve_service(&args, stored)?;

        let (shop, source) = effective_settings(&context).await?;
        let params = build_params(&args, shop, &service)?;
        let breakdown = quote(&DeterministicPricingEngine, &params)?;

        tracing::info!(
            event_name = "cli.quote.calculated",
            correlation_id = %context.correlation_id,
            service_name = %service.name,
            rule = breakdown.rule_label(),
            final_price_local = %breakdown.final_price_local,
            "quote calculated"
        );

        let history_id = if args.save {
            let record = NewHistoryRecord {
                service_id: (service.id.0 != AD_HOC_SERVICE_ID).then(|| service.id.clone()),
                service_name: service.name.clone(),
                brand: args.brand.clone(),
                device_model: args.model.clone(),
                part_type: args.part_type.clone(),
                part_cost: params.part_cost,
                currency: params.currency,
                breakdown: breakdown.clone(),
                metadata: args.metadata(),
            };
            let history = SqlHistoryRepository::new(context.pool.clone());
            Some(history.append(record).await?.0)
        } else {
            None
        };

        CommandOutput::ok(
            format!(
                "{}: {} local ({} USD) via {}",
                service.name,
                breakdown.final_price_local,
                breakdown.final_price_usd,
                breakdown.rule_label()
            ),
            json!({
                "service": to_json_value(&service)?,
                "settings_source": source.as_str(),
                "params": to_json_value(&params)?,
                "breakdown": to_json_value(&breakdown)?,
                "rule": breakdown.rule_label(),
                "history_id": history_id,
            }),
        )
    })
}

#[cfg(test)]
mod tests {
    use plugfix_core::domain::service::ServiceDefinition;
    use plugfix_core::domain::shop::ShopConfig;
    use plugfix_core::errors::DomainError;
    use plugfix_core::pricing::{Currency, SecurityTier};
    use rust_decimal::Decimal;

    use super::{build_params, resolve_service, QuoteArgs};

    #[test]
    fn ad_hoc_service_takes_name_and_base_price() {
        let args = QuoteArgs {
            name: Some("  Cambio de pantalla ".to_owned()),
            base_price: Some(Decimal::from(20_000)),
            ..QuoteArgs::default()
        };

        let service = resolve_service(&args, None).expect("ad-hoc service");
        assert_eq!(service.name, "Cambio de pantalla");
        assert_eq!(service.base_price, Decimal::from(20_000));
    }

    #[test]
    fn unknown_stored_service_is_an_error() {
        let args = QuoteArgs { service: Some("svc-missing".to_owned()), ..QuoteArgs::default() };
        assert!(matches!(
            resolve_service(&args, None),
            Err(DomainError::InvariantViolation(ref m)) if m.contains("svc-missing")
        ));
    }

    #[test]
    fn quote_without_any_service_is_an_error() {
        assert!(resolve_service(&QuoteArgs::default(), None).is_err());
    }

    #[test]
    fn base_price_flag_overrides_stored_price() {
        let stored = ServiceDefinition::new("svc", "Pin de carga", Decimal::from(12_000));
        let args = QuoteArgs { base_price: Some(Decimal::from(9_000)), ..QuoteArgs::default() };

        let service = resolve_service(&args, Some(stored)).expect("stored service");
        assert_eq!(service.base_price, Decimal::from(9_000));
    }

    #[test]
    fn per_quote_overrides_do_not_need_saved_settings() {
        let service = ServiceDefinition::new("svc", "Desbloqueo FRP", Decimal::from(15_000));
        let args = QuoteArgs {
            usd_rate: Some(Decimal::from(1500)),
            currency: Currency::Usd,
            part_cost: Decimal::from(10),
            security_tier: 2,
            ..QuoteArgs::default()
        };

        let params = build_params(&args, ShopConfig::default(), &service).expect("params");
        assert_eq!(params.usd_rate, Decimal::from(1500));
        assert_eq!(params.security_tier, SecurityTier::Elevated);
        assert!(params.is_security_unlock_service);
        assert!(!params.is_module_service);
    }

    #[test]
    fn out_of_range_tier_is_rejected() {
        let service = ServiceDefinition::new("svc", "Desbloqueo FRP", Decimal::ZERO);
        let args = QuoteArgs { security_tier: 4, ..QuoteArgs::default() };
        assert!(build_params(&args, ShopConfig::default(), &service).is_err());
    }
}
