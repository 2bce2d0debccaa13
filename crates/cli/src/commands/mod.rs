pub mod catalog;
pub mod classify;
pub mod config;
pub mod history;
pub mod import;
pub mod migrate;
pub mod quote;
pub mod seed;
pub mod service;
pub mod settings;

use std::future::Future;

use plugfix_core::config::{AppConfig, LoadOptions};
use plugfix_core::errors::{ApplicationError, InterfaceError};
use plugfix_db::{connect_with_settings, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_BAD_REQUEST: u8 = 6;
pub const EXIT_INTERNAL: u8 = 7;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    data: Value,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>, data: Value) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, Value::Null)
    }

    fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Value,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Renders an application failure through the interface error layer so the
    /// payload carries a user-safe message and the correlation id.
    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
    ) -> Self {
        let interface = error.into_interface(correlation_id);
        let (error_class, exit_code, message, correlation_id) = match &interface {
            InterfaceError::BadRequest { message, correlation_id } => {
                ("bad_request", EXIT_BAD_REQUEST, message, correlation_id)
            }
            InterfaceError::ServiceUnavailable { message, correlation_id } => {
                ("service_unavailable", EXIT_DB_CONNECTIVITY, message, correlation_id)
            }
            InterfaceError::Internal { message, correlation_id } => {
                ("internal", EXIT_INTERNAL, message, correlation_id)
            }
        };

        tracing::warn!(
            event_name = "cli.command.failed",
            command,
            error_class,
            correlation_id = %correlation_id,
            "{message}"
        );

        Self::failure_with_data(
            command,
            error_class,
            message.clone(),
            exit_code,
            serde_json::json!({
                "correlation_id": correlation_id,
                "user_message": interface.user_message(),
            }),
        )
    }
}

/// What a command hands back on success.
#[derive(Debug)]
pub struct CommandOutput {
    pub message: String,
    pub data: Value,
}

impl CommandOutput {
    pub fn new(message: impl Into<String>, data: Value) -> Self {
        Self { message: message.into(), data }
    }

    /// Tail expression for command bodies; pins the body's error type.
    pub fn ok(message: impl Into<String>, data: Value) -> Result<Self, ApplicationError> {
        Ok(Self::new(message, data))
    }
}

/// Everything a command body needs once the database is reachable.
#[derive(Clone, Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub pool: DbPool,
    pub correlation_id: String,
}

pub fn load_config(command: &str, options: &LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

/// Loads config, connects, applies pending migrations, then runs `action`.
pub fn with_database<F, Fut>(command: &str, options: &LoadOptions, action: F) -> CommandResult
where
    F: FnOnce(AppContext) -> Fut,
    Fut: Future<Output = Result<CommandOutput, ApplicationError>>,
{
    let config = match load_config(command, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime(command) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let correlation_id = uuid::Uuid::new_v4().to_string();

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(
                    command,
                    "db_connectivity",
                    error.to_string(),
                    EXIT_DB_CONNECTIVITY,
                )
            }
        };

        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return CommandResult::failure(command, "migration", error.to_string(), EXIT_MIGRATION);
        }

        tracing::debug!(
            event_name = "cli.command.start",
            command,
            correlation_id = %correlation_id,
            "command started"
        );

        let context =
            AppContext { config, pool: pool.clone(), correlation_id: correlation_id.clone() };
        let outcome = action(context).await;
        pool.close().await;

        match outcome {
            Ok(output) => CommandResult::success(command, output.message, output.data),
            Err(error) => CommandResult::from_application_error(command, error, &correlation_id),
        }
    })
}

pub(crate) fn to_json_value<T: Serialize>(value: &T) -> Result<Value, ApplicationError> {
    serde_json::to_value(value).map_err(|error| ApplicationError::Export(error.to_string()))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\",\"data\":null}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
