use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use plugfix_cli::commands::catalog::{
    AddModelArgs, CatalogCommand, EntryCommand, ModelCommand, NamedArgs,
};
use plugfix_cli::commands::history::{HistoryCommand, UpdateHistoryArgs};
use plugfix_cli::commands::quote::QuoteArgs;
use plugfix_cli::commands::service::{AddServiceArgs, ServiceCommand};
use plugfix_cli::commands::settings::{SettingsCommand, SettingsPatch};
use plugfix_cli::commands::{
    catalog, classify, config, history, import, migrate, quote, seed, service, settings,
    CommandResult,
};
use plugfix_core::config::LoadOptions;
use plugfix_core::domain::history::HistoryStatus;
use plugfix_core::export::ExportFormat;
use plugfix_core::pricing::Currency;
use rust_decimal::Decimal;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_database_env(&[], || {
        let result = migrate::run(&LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["migrations"], 1);
    });
}

#[test]
fn invalid_shop_config_fails_before_touching_the_database() {
    with_database_env(&[("PLUGFIX_SHOP_USD_RATE", "0")], || {
        let result = migrate::run(&LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let first = seed::run(&options);
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let second = seed::run(&options);
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first);
        let second_payload = parse_payload(&second);
        assert!(first_payload["data"]["rows_inserted"].as_u64().unwrap_or(0) > 0);
        assert_eq!(second_payload["data"]["rows_inserted"], 0);

        let listed = parse_payload(&service::run(&options, ServiceCommand::List));
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(7));
    });
}

#[test]
fn quote_prices_a_seeded_module_service_and_saves_it() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        assert_eq!(seed::run(&options).exit_code, 0);

        let result = quote::run(
            &options,
            QuoteArgs {
                service: Some("cambio-de-pantalla".to_owned()),
                part_cost: Decimal::from(50_000),
                security_tier: 1,
                brand: Some("Samsung".to_owned()),
                client: Some("Ana".to_owned()),
                save: true,
                ..QuoteArgs::default()
            },
        );
        assert_eq!(result.exit_code, 0, "quote failed: {}", result.output);

        let payload = parse_payload(&result);
        assert_eq!(payload["data"]["rule"], "module_repair");
        assert_eq!(payload["data"]["settings_source"], "config");
        assert_eq!(payload["data"]["breakdown"]["final_price_local"], "110000");
        assert_eq!(payload["data"]["breakdown"]["final_price_usd"], "91.67");
        let history_id =
            payload["data"]["history_id"].as_str().expect("saved quote has an id").to_owned();

        let listed = parse_payload(&history::run(&options, HistoryCommand::List { limit: None }));
        assert_eq!(listed["data"][0]["id"], history_id.as_str());
        assert_eq!(listed["data"][0]["metadata"]["client_name"], "Ana");
        assert_eq!(listed["data"][0]["service_id"], "cambio-de-pantalla");
    });
}

#[test]
fn ad_hoc_quote_uses_minimum_labor_and_is_not_saved_by_default() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let result = quote::run(
            &options,
            QuoteArgs {
                name: Some("Cambio de batería".to_owned()),
                part_cost: Decimal::from(10_000),
                security_tier: 1,
                ..QuoteArgs::default()
            },
        );
        assert_eq!(result.exit_code, 0, "quote failed: {}", result.output);

        let payload = parse_payload(&result);
        assert_eq!(payload["data"]["rule"], "standard");
        // 10000 + 40% margin + 13000 labor = 27000
        assert_eq!(payload["data"]["breakdown"]["final_price_local"], "27000");
        assert_eq!(payload["data"]["history_id"], Value::Null);

        let listed = parse_payload(&history::run(&options, HistoryCommand::List { limit: None }));
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(0));
    });
}

#[test]
fn invalid_quote_reports_every_validation_message() {
    with_database_env(&[], || {
        let result = quote::run(
            &LoadOptions::default(),
            QuoteArgs {
                name: Some("Pin de carga".to_owned()),
                part_cost: Decimal::from(-1),
                base_price: Some(Decimal::from(-1)),
                security_tier: 1,
                ..QuoteArgs::default()
            },
        );
        assert_eq!(result.exit_code, 6, "expected bad request exit code");

        let payload = parse_payload(&result);
        assert_eq!(payload["error_class"], "bad_request");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("Part cost cannot be negative"));
        assert!(message.contains("Service base price cannot be negative"));
        assert!(payload["data"]["correlation_id"].is_string());
    });
}

#[test]
fn oversized_usd_part_cost_is_a_bad_request() {
    with_database_env(&[], || {
        let result = quote::run(
            &LoadOptions::default(),
            QuoteArgs {
                name: Some("Cambio de pantalla".to_owned()),
                part_cost: Decimal::from(10_000_000_000_000_000_000_u64),
                currency: Currency::Usd,
                usd_rate: Some(Decimal::from(10_000_000_000_u64)),
                security_tier: 1,
                ..QuoteArgs::default()
            },
        );
        assert_eq!(result.exit_code, 6, "expected bad request exit code");

        let payload = parse_payload(&result);
        assert_eq!(payload["error_class"], "bad_request");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("Part cost is too large for the configured USD rate"));
    });
}

#[test]
fn saved_settings_take_over_from_config_defaults() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let shown = parse_payload(&settings::run(&options, SettingsCommand::Show));
        assert_eq!(shown["data"]["source"], "config");

        let set = settings::run(
            &options,
            SettingsCommand::Set(SettingsPatch {
                usd_rate: Some(Decimal::from(1000)),
                ..SettingsPatch::default()
            }),
        );
        assert_eq!(set.exit_code, 0, "settings set failed: {}", set.output);

        let shown = parse_payload(&settings::run(&options, SettingsCommand::Show));
        assert_eq!(shown["data"]["source"], "stored");
        assert_eq!(shown["data"]["settings"]["usd_rate"], "1000");

        let rejected = settings::run(
            &options,
            SettingsCommand::Set(SettingsPatch {
                margin: Some(Decimal::from(900)),
                ..SettingsPatch::default()
            }),
        );
        assert_eq!(rejected.exit_code, 6);
        let shown = parse_payload(&settings::run(&options, SettingsCommand::Show));
        assert_eq!(shown["data"]["settings"]["default_margin"], "40");
    });
}

#[test]
fn history_status_updates_follow_the_lifecycle() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let saved = parse_payload(&quote::run(
            &options,
            QuoteArgs {
                name: Some("Desbloqueo FRP".to_owned()),
                base_price: Some(Decimal::from(15_000)),
                security_tier: 2,
                save: true,
                ..QuoteArgs::default()
            },
        ));
        assert_eq!(saved["data"]["breakdown"]["final_price_local"], "30000");
        let id = saved["data"]["history_id"].as_str().expect("history id").to_owned();

        let skipped = history::run(
            &options,
            HistoryCommand::Update(UpdateHistoryArgs {
                id: id.clone(),
                status: Some(HistoryStatus::Delivered),
                ..UpdateHistoryArgs::default()
            }),
        );
        assert_eq!(skipped.exit_code, 6, "pending quotes cannot jump to delivered");

        let completed = history::run(
            &options,
            HistoryCommand::Update(UpdateHistoryArgs {
                id: id.clone(),
                status: Some(HistoryStatus::Completed),
                supplier: Some("Mayorista".to_owned()),
                ..UpdateHistoryArgs::default()
            }),
        );
        assert_eq!(completed.exit_code, 0, "update failed: {}", completed.output);
        let payload = parse_payload(&completed);
        assert_eq!(payload["data"]["metadata"]["status"], "completed");
        assert_eq!(payload["data"]["metadata"]["supplier"], "Mayorista");
        assert_eq!(payload["data"]["breakdown"]["final_price_local"], "30000");

        let missing = history::run(
            &options,
            HistoryCommand::Update(UpdateHistoryArgs {
                id: "does-not-exist".to_owned(),
                ..UpdateHistoryArgs::default()
            }),
        );
        assert_eq!(missing.exit_code, 6);
    });
}

#[test]
fn history_export_writes_csv_file() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let saved = quote::run(
            &options,
            QuoteArgs {
                name: Some("Pin de carga".to_owned()),
                part_cost: Decimal::from(5_000),
                security_tier: 1,
                save: true,
                ..QuoteArgs::default()
            },
        );
        assert_eq!(saved.exit_code, 0);

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("quotes.csv");
        let result = history::run(
            &options,
            HistoryCommand::Export { format: ExportFormat::Csv, output: Some(path.clone()) },
        );
        assert_eq!(result.exit_code, 0, "export failed: {}", result.output);
        assert_eq!(parse_payload(&result)["data"]["records"], 1);

        let csv = fs::read_to_string(&path).expect("export file");
        let mut lines = csv.lines();
        assert!(lines.next().unwrap_or_default().starts_with("id,created_at,service_name"));
        assert!(lines.next().unwrap_or_default().contains("Pin de carga"));
    });
}

#[test]
fn import_writes_accepted_entries_and_reports_rejections() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{
                "brands": [{"name": "Nokia"}],
                "models": [{"brand": "Nokia", "name": "G21"}, {"brand": "Sony", "name": "Xperia 10"}],
                "services": [
                    {"name": "Cambio de módulo", "base_price": 22000},
                    {"name": "Glass", "base_price": -100}
                ]
            }"#,
        )
        .expect("write import file");

        let result = import::run(&options, &path);
        assert_eq!(result.exit_code, 0, "import failed: {}", result.output);

        let payload = parse_payload(&result);
        assert_eq!(payload["data"]["brands"], 1);
        assert_eq!(payload["data"]["models"], 1);
        assert_eq!(payload["data"]["services"], 1);
        assert_eq!(payload["data"]["rejections"].as_array().map(Vec::len), Some(2));

        let services = parse_payload(&service::run(&options, ServiceCommand::List));
        assert_eq!(services["data"][0]["id"], "cambio-de-modulo");
        assert_eq!(services["data"][0]["is_module_service"], true);
    });
}

#[test]
fn malformed_import_is_a_bad_request() {
    with_database_env(&[], || {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write import file");

        let result = import::run(&LoadOptions::default(), &path);
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result)["error_class"], "bad_request");
    });
}

#[test]
fn service_add_and_remove_round_trip() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let added = service::run(
            &options,
            ServiceCommand::Add(AddServiceArgs {
                name: "Eliminar cuenta Google".to_owned(),
                id: None,
                base_price: Decimal::from(18_000),
            }),
        );
        assert_eq!(added.exit_code, 0, "add failed: {}", added.output);
        let payload = parse_payload(&added);
        assert_eq!(payload["data"]["id"], "eliminar-cuenta-google");
        assert_eq!(payload["data"]["is_security_unlock_service"], true);

        let removed = service::run(
            &options,
            ServiceCommand::Remove { id: "eliminar-cuenta-google".to_owned() },
        );
        assert_eq!(removed.exit_code, 0);

        let again = service::run(
            &options,
            ServiceCommand::Remove { id: "eliminar-cuenta-google".to_owned() },
        );
        assert_eq!(again.exit_code, 6);
    });
}

#[test]
fn catalog_crud_cascades_brand_removal_to_models() {
    with_database_env(&[], || {
        let options = LoadOptions::default();
        let brand = catalog::run(
            &options,
            CatalogCommand::Brand(EntryCommand::Add(NamedArgs {
                name: "Nokia".to_owned(),
                id: None,
            })),
        );
        assert_eq!(brand.exit_code, 0, "brand add failed: {}", brand.output);

        for name in ["G21", "X30"] {
            let model = catalog::run(
                &options,
                CatalogCommand::Model(ModelCommand::Add(AddModelArgs {
                    brand: "nokia".to_owned(),
                    name: name.to_owned(),
                    id: None,
                })),
            );
            assert_eq!(model.exit_code, 0, "model add failed: {}", model.output);
        }

        let part_type = catalog::run(
            &options,
            CatalogCommand::PartType(EntryCommand::Add(NamedArgs {
                name: "Flex de carga".to_owned(),
                id: None,
            })),
        );
        assert_eq!(part_type.exit_code, 0);
        assert_eq!(parse_payload(&part_type)["data"]["id"], "flex-de-carga");

        let models = parse_payload(&catalog::run(
            &options,
            CatalogCommand::Model(ModelCommand::List { brand: Some("Nokia".to_owned()) }),
        ));
        assert_eq!(models["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(models["data"][0]["id"], "nokia-g21");

        let orphan = catalog::run(
            &options,
            CatalogCommand::Model(ModelCommand::Add(AddModelArgs {
                brand: "Sony".to_owned(),
                name: "Xperia 10".to_owned(),
                id: None,
            })),
        );
        assert_eq!(orphan.exit_code, 6);

        let removed = catalog::run(
            &options,
            CatalogCommand::Brand(EntryCommand::Remove { id: "nokia".to_owned() }),
        );
        assert_eq!(removed.exit_code, 0, "brand remove failed: {}", removed.output);
        assert_eq!(parse_payload(&removed)["data"]["models_removed"], 2);

        let models = parse_payload(&catalog::run(
            &options,
            CatalogCommand::Model(ModelCommand::List { brand: None }),
        ));
        assert_eq!(models["data"].as_array().map(Vec::len), Some(0));

        let part_types = parse_payload(&catalog::run(
            &options,
            CatalogCommand::PartType(EntryCommand::List),
        ));
        assert_eq!(part_types["data"][0]["name"], "Flex de carga");

        let removed = catalog::run(
            &options,
            CatalogCommand::PartType(EntryCommand::Remove { id: "flex-de-carga".to_owned() }),
        );
        assert_eq!(removed.exit_code, 0);
        let again = catalog::run(
            &options,
            CatalogCommand::Model(ModelCommand::Remove { id: "nokia-g21".to_owned() }),
        );
        assert_eq!(again.exit_code, 6);
    });
}

#[test]
fn classify_needs_no_database() {
    with_env(&[("PLUGFIX_DATABASE_URL", "sqlite:///nonexistent/dir/shop.db")], || {
        let result = classify::run("Desbloqueo FRP");
        assert_eq!(result.exit_code, 0);
        assert_eq!(parse_payload(&result)["data"]["rule"], "security_unlock");
    });
}

#[test]
fn config_reports_env_sources() {
    with_database_env(&[("PLUGFIX_SHOP_USD_RATE", "1350")], || {
        let result = config::run(&LoadOptions::default());
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result);
        let values = payload["data"]["values"].as_array().cloned().unwrap_or_default();
        let usd_rate = values
            .iter()
            .find(|line| line["key"] == "shop.usd_rate")
            .expect("usd rate line")
            .clone();
        assert_eq!(usd_rate["value"], "1350");
        assert_eq!(usd_rate["source"], "env (PLUGFIX_SHOP_USD_RATE)");
    });
}

fn parse_payload(result: &CommandResult) -> Value {
    serde_json::from_str(&result.output).expect("command output should be valid JSON")
}

/// Runs `test_fn` against a fresh SQLite file.
fn with_database_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("plugfix.db").display());
    let mut all_vars = vec![("PLUGFIX_DATABASE_URL", url.as_str())];
    all_vars.extend_from_slice(vars);
    with_env(&all_vars, test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PLUGFIX_DATABASE_URL",
        "PLUGFIX_DATABASE_MAX_CONNECTIONS",
        "PLUGFIX_DATABASE_TIMEOUT_SECS",
        "PLUGFIX_SHOP_USD_RATE",
        "PLUGFIX_SHOP_DEFAULT_MARGIN",
        "PLUGFIX_SHOP_MINIMUM_LABOR_COST",
        "PLUGFIX_SHOP_APPLY_MODULE_REPAIR_RULE",
        "PLUGFIX_LOGGING_LEVEL",
        "PLUGFIX_LOGGING_FORMAT",
        "PLUGFIX_LOG_LEVEL",
        "PLUGFIX_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
