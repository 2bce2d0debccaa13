use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use plugfix_core::config::LoadOptions;
use serde::Serialize;
use serde_json::json;
use toml::Value;

use crate::commands::{load_config, CommandResult};

#[derive(Debug, Serialize)]
struct ConfigLine {
    key: &'static str,
    value: String,
    source: String,
}

/// Effective configuration with the layer each value came from.
pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("config", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let file_path = detect_config_path(options.config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());
    let source = |key: &str, env_keys: &[&str], overridden: bool| {
        if overridden {
            return "override (command line)".to_string();
        }
        field_source(key, env_keys, file_doc.as_ref(), file_path.as_deref())
    };
    let overrides = &options.overrides;

    let lines = vec![
        ConfigLine {
            key: "database.url",
            value: config.database.url.clone(),
            source: source(
                "database.url",
                &["PLUGFIX_DATABASE_URL"],
                overrides.database_url.is_some(),
            ),
        },
        ConfigLine {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            source: source("database.max_connections", &["PLUGFIX_DATABASE_MAX_CONNECTIONS"], false),
        },
        ConfigLine {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            source: source("database.timeout_secs", &["PLUGFIX_DATABASE_TIMEOUT_SECS"], false),
        },
        ConfigLine {
            key: "shop.usd_rate",
            value: config.shop.usd_rate.to_string(),
            source: source("shop.usd_rate", &["PLUGFIX_SHOP_USD_RATE"], false),
        },
        ConfigLine {
            key: "shop.default_margin",
            value: config.shop.default_margin.to_string(),
            source: source("shop.default_margin", &["PLUGFIX_SHOP_DEFAULT_MARGIN"], false),
        },
        ConfigLine {
            key: "shop.minimum_labor_cost",
            value: config.shop.minimum_labor_cost.to_string(),
            source: source("shop.minimum_labor_cost", &["PLUGFIX_SHOP_MINIMUM_LABOR_COST"], false),
        },
        ConfigLine {
            key: "shop.apply_module_repair_rule",
            value: config.shop.apply_module_repair_rule.to_string(),
            source: source(
                "shop.apply_module_repair_rule",
                &["PLUGFIX_SHOP_APPLY_MODULE_REPAIR_RULE"],
                false,
            ),
        },
        ConfigLine {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: source(
                "logging.level",
                &["PLUGFIX_LOGGING_LEVEL", "PLUGFIX_LOG_LEVEL"],
                overrides.log_level.is_some(),
            ),
        },
        ConfigLine {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source: source(
                "logging.format",
                &["PLUGFIX_LOGGING_FORMAT", "PLUGFIX_LOG_FORMAT"],
                overrides.log_format.is_some(),
            ),
        },
    ];

    CommandResult::success(
        "config",
        "effective config (source precedence: override > env > file > default)",
        json!({
            "config_file": file_path.map(|path| path.display().to_string()),
            "values": lines,
        }),
    )
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("plugfix.toml"), PathBuf::from("config/plugfix.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
