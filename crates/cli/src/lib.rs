pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use plugfix_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

use crate::commands::catalog::CatalogCommand;
use crate::commands::history::HistoryCommand;
use crate::commands::quote::QuoteArgs;
use crate::commands::service::ServiceCommand;
use crate::commands::settings::SettingsCommand;

#[derive(Debug, Parser)]
#[command(
    name = "plugfix",
    about = "PlugFix repair quote calculator",
    long_about = "Price phone repairs from part cost, shop settings and service rules; keep a history of quotes.",
    after_help = "Examples:\n  plugfix seed\n  plugfix quote --service cambio-de-pantalla --part-cost 50000 --save\n  plugfix history export --format csv --output quotes.csv"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to plugfix.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the database url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override the log level")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override the log format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a repair and optionally save it to history")]
    Quote(QuoteArgs),
    #[command(about = "Show which pricing rule a service name triggers")]
    Classify {
        #[arg(help = "Service name")]
        name: String,
    },
    #[command(subcommand, about = "Show or change shop settings")]
    Settings(SettingsCommand),
    #[command(subcommand, about = "Manage the service catalog")]
    Service(ServiceCommand),
    #[command(subcommand, about = "Manage brands, device models and part types")]
    Catalog(CatalogCommand),
    #[command(subcommand, about = "Browse, edit and export saved quotes")]
    History(HistoryCommand),
    #[command(about = "Import brands, models, part types and services from a JSON file")]
    Import {
        #[arg(help = "Path to the JSON document")]
        file: PathBuf,
    },
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the demo catalog (idempotent)")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                log_format: self.log_format,
            },
        }
    }
}

/// Logs go to stderr; stdout carries only the command payload.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_new(config.logging.level.trim())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A second init in the same process is a no-op.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    // Invalid config is reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = execute(cli.command, &options);
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn execute(command: Command, options: &LoadOptions) -> commands::CommandResult {
    match command {
        Command::Quote(args) => commands::quote::run(options, args),
        Command::Classify { name } => commands::classify::run(&name),
        Command::Settings(command) => commands::settings::run(options, command),
        Command::Service(command) => commands::service::run(options, command),
        Command::Catalog(command) => commands::catalog::run(options, command),
        Command::History(command) => commands::history::run(options, command),
        Command::Import { file } => commands::import::run(options, &file),
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Config => commands::config::run(options),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};
    use crate::commands::catalog::{CatalogCommand, ModelCommand};

    #[test]
    fn global_overrides_reach_load_options() {
        let cli = Cli::try_parse_from([
            "plugfix",
            "--database-url",
            "sqlite://shop.db",
            "--log-format",
            "json",
            "classify",
            "Cambio de pantalla",
        ])
        .expect("valid arguments");

        let options = cli.load_options();
        assert_eq!(options.overrides.database_url.as_deref(), Some("sqlite://shop.db"));
        assert!(!options.require_file);
        assert!(matches!(cli.command, Command::Classify { ref name } if name == "Cambio de pantalla"));
    }

    #[test]
    fn catalog_subcommands_nest_under_entity() {
        let cli = Cli::try_parse_from([
            "plugfix", "catalog", "model", "add", "--brand", "Samsung", "--name", "Galaxy A52",
        ])
        .expect("valid arguments");

        let Command::Catalog(CatalogCommand::Model(ModelCommand::Add(args))) = cli.command else {
            panic!("expected catalog model add");
        };
        assert_eq!(args.brand, "Samsung");
        assert_eq!(args.name, "Galaxy A52");
        assert!(Cli::try_parse_from(["plugfix", "catalog", "part-type", "list"]).is_ok());
    }

    #[test]
    fn quote_arguments_parse_decimals_and_currency() {
        let cli = Cli::try_parse_from([
            "plugfix",
            "quote",
            "--name",
            "Pin de carga",
            "--part-cost",
            "12.50",
            "--currency",
            "usd",
            "--security-tier",
            "3",
        ])
        .expect("valid arguments");

        let Command::Quote(args) = cli.command else {
            panic!("expected quote command");
        };
        assert_eq!(args.part_cost.to_string(), "12.50");
        assert_eq!(args.currency.as_str(), "usd");
        assert_eq!(args.security_tier, 3);
    }

    #[test]
    fn security_tier_outside_range_is_a_usage_error() {
        let parsed = Cli::try_parse_from(["plugfix", "quote", "--name", "FRP", "--security-tier", "5"]);
        assert!(parsed.is_err());
    }
}
