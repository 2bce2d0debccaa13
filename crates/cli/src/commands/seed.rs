use plugfix_core::config::LoadOptions;
use plugfix_core::errors::ApplicationError;
use plugfix_db::CatalogSeedDataset;

use crate::commands::{with_database, CommandOutput, CommandResult};

pub fn run(options: &LoadOptions) -> CommandResult {
    with_database("seed", options, |context| async move {
        let result = CatalogSeedDataset::load(&context.pool).await?;
        let verification = CatalogSeedDataset::verify(&context.pool).await?;

        if !verification.all_present {
            return Err(ApplicationError::Persistence(seed_failure_message(
                &verification.failed_checks(),
            )));
        }

        CommandOutput::ok(
            format!(
                "demo catalog ready: {} brands, {} part types, {} services",
                result.brands, result.part_types, result.services
            ),
            result.to_json(),
        )
    })
}

fn seed_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
