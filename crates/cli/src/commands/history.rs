use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use plugfix_core::config::LoadOptions;
use plugfix_core::domain::history::{HistoryId, HistoryMetadata, HistoryStatus};
use plugfix_core::errors::{ApplicationError, DomainError};
use plugfix_core::export::{export_history, ExportFormat};
use plugfix_db::repositories::{HistoryRepository, SqlHistoryRepository};
use serde_json::json;

use crate::commands::{to_json_value, with_database, CommandOutput, CommandResult};

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    #[command(about = "List saved quotes, newest first")]
    List {
        #[arg(long, help = "Only the N most recent quotes")]
        limit: Option<usize>,
    },
    #[command(about = "Edit client, notes, supplier or status of a saved quote")]
    Update(UpdateHistoryArgs),
    #[command(about = "Export saved quotes as csv or json")]
    Export {
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        #[arg(long, help = "Write to this file instead of the payload")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Default, Args)]
pub struct UpdateHistoryArgs {
    pub id: String,
    #[arg(long, help = "pending|in_progress|completed|delivered|cancelled")]
    pub status: Option<HistoryStatus>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub supplier: Option<String>,
}

impl UpdateHistoryArgs {
    /// Fields left out keep their current value; an empty string clears one.
    pub fn merge(&self, current: &HistoryMetadata) -> HistoryMetadata {
        fn pick(update: &Option<String>, current: &Option<String>) -> Option<String> {
            match update {
                Some(value) if value.trim().is_empty() => None,
                Some(value) => Some(value.trim().to_owned()),
                None => current.clone(),
            }
        }

        HistoryMetadata {
            client_name: pick(&self.client, &current.client_name),
            notes: pick(&self.notes, &current.notes),
            status: self.status.unwrap_or(current.status),
            supplier: pick(&self.supplier, &current.supplier),
        }
    }
}

pub fn run(options: &LoadOptions, command: HistoryCommand) -> CommandResult {
    match command {
        HistoryCommand::List { limit } => with_database("history", options, |context| async move {
            let records = SqlHistoryRepository::new(context.pool.clone()).list(limit).await?;
            CommandOutput::ok(
                format!("{} saved quotes", records.len()),
                to_json_value(&records)?,
            )
        }),
        HistoryCommand::Update(args) => with_database("history", options, |context| async move {
            let repository = SqlHistoryRepository::new(context.pool.clone());
            let id = HistoryId(args.id.clone());
            let current = repository.find_by_id(&id).await?.ok_or_else(|| {
                ApplicationError::from(DomainError::InvariantViolation(format!(
                    "no saved quote with id `{}`",
                    id.0
                )))
            })?;

            let updated = repository.update_metadata(&id, args.merge(&current.metadata)).await?;
            CommandOutput::ok(
                format!("updated saved quote `{}` ({})", id.0, updated.metadata.status.as_str()),
                to_json_value(&updated)?,
            )
        }),
        HistoryCommand::Export { format, output } => {
            with_database("history", options, |context| async move {
                let records = SqlHistoryRepository::new(context.pool.clone()).list(None).await?;
                let rendered = export_history(&records, format)
                    .map_err(|error| ApplicationError::Export(error.to_string()))?;

                match output {
                    Some(path) => {
                        fs::write(&path, &rendered).map_err(|error| {
                            ApplicationError::Export(format!("{}: {error}", path.display()))
                        })?;
                        CommandOutput::ok(
                            format!("exported {} saved quotes to {}", records.len(), path.display()),
                            json!({ "records": records.len(), "path": path.display().to_string() }),
                        )
                    }
                    None => CommandOutput::ok(
                        format!("exported {} saved quotes", records.len()),
                        json!({ "records": records.len(), "content": rendered }),
                    ),
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use plugfix_core::domain::history::{HistoryMetadata, HistoryStatus};

    use super::UpdateHistoryArgs;

    #[test]
    fn merge_keeps_untouched_fields_and_clears_empty_ones() {
        let current = HistoryMetadata {
            client_name: Some("Ana".to_owned()),
            notes: Some("Sin cargador".to_owned()),
            status: HistoryStatus::InProgress,
            supplier: Some("Mayorista".to_owned()),
        };
        let args = UpdateHistoryArgs {
            id: "H-1".to_owned(),
            status: Some(HistoryStatus::Completed),
            notes: Some(String::new()),
            ..UpdateHistoryArgs::default()
        };

        let merged = args.merge(&current);
        assert_eq!(merged.client_name.as_deref(), Some("Ana"));
        assert_eq!(merged.notes, None);
        assert_eq!(merged.status, HistoryStatus::Completed);
        assert_eq!(merged.supplier.as_deref(), Some("Mayorista"));
    }
}
