use plugfix_core::config::LoadOptions;
use plugfix_db::migrations::MIGRATOR;
use serde_json::json;

use crate::commands::{with_database, CommandOutput, CommandResult};

/// `with_database` applies pending migrations before running any command, so
/// this only reports what the schema is at.
pub fn run(options: &LoadOptions) -> CommandResult {
    with_database("migrate", options, |_context| async move {
        let versions: Vec<i64> = MIGRATOR
            .iter()
            .filter(|migration| !migration.migration_type.is_down_migration())
            .map(|migration| migration.version)
            .collect();
        CommandOutput::ok(
            "applied pending migrations",
            json!({ "migrations": versions.len(), "latest_version": versions.iter().max() }),
        )
    })
}
