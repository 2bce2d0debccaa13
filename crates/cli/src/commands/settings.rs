use clap::{Args, Subcommand};
use plugfix_core::config::LoadOptions;
use plugfix_core::domain::shop::ShopConfig;
use plugfix_core::errors::ApplicationError;
use plugfix_db::repositories::{ShopConfigRepository, SqlShopConfigRepository};
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::{to_json_value, with_database, AppContext, CommandOutput, CommandResult};

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    #[command(about = "Show the shop settings quotes are priced with")]
    Show,
    #[command(about = "Change one or more shop settings")]
    Set(SettingsPatch),
}

#[derive(Debug, Default, Args)]
pub struct SettingsPatch {
    #[arg(long, help = "Local currency units per USD")]
    pub usd_rate: Option<Decimal>,
    #[arg(long, help = "Percentage markup on part cost (0-500)")]
    pub margin: Option<Decimal>,
    #[arg(long, help = "Labor charged when a service has no base price")]
    pub min_labor: Option<Decimal>,
    #[arg(long, help = "Enable or disable the module repair formula")]
    pub module_rule: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.usd_rate.is_none()
            && self.margin.is_none()
            && self.min_labor.is_none()
            && self.module_rule.is_none()
    }

    pub fn apply(&self, mut config: ShopConfig) -> ShopConfig {
        if let Some(usd_rate) = self.usd_rate {
            config.usd_rate = usd_rate;
        }
        if let Some(margin) = self.margin {
            config.default_margin = margin;
        }
        if let Some(min_labor) = self.min_labor {
            config.minimum_labor_cost = min_labor;
        }
        if let Some(module_rule) = self.module_rule {
            config.apply_module_repair_rule = module_rule;
        }
        config
    }
}

/// Where the effective settings came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsSource {
    Stored,
    ConfigDefaults,
}

impl SettingsSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::ConfigDefaults => "config",
        }
    }
}

/// Saved settings win; the `[shop]` config section fills in until the first save.
pub async fn effective_settings(
    context: &AppContext,
) -> Result<(ShopConfig, SettingsSource), ApplicationError> {
    let repository = SqlShopConfigRepository::new(context.pool.clone());
    Ok(match repository.get().await? {
        Some(stored) => (stored, SettingsSource::Stored),
        None => (context.config.shop.clone(), SettingsSource::ConfigDefaults),
    })
}

pub fn run(options: &LoadOptions, command: SettingsCommand) -> CommandResult {
    match command {
        SettingsCommand::Show => with_database("settings", options, |context| async move {
            let (settings, source) = effective_settings(&context).await?;
            CommandOutput::ok(
                format!("shop settings ({} values)", source.as_str()),
                json!({ "source": source.as_str(), "settings": to_json_value(&settings)? }),
            )
        }),
        SettingsCommand::Set(patch) => with_database("settings", options, |context| async move {
            let (current, _) = effective_settings(&context).await?;
            let updated = patch.apply(current);
            updated.validate()?;

            SqlShopConfigRepository::new(context.pool.clone()).save(updated.clone()).await?;
            CommandOutput::ok(
                if patch.is_empty() { "shop settings saved unchanged" } else { "shop settings updated" },
                json!({ "source": SettingsSource::Stored.as_str(), "settings": to_json_value(&updated)? }),
            )
        }),
    }
}
