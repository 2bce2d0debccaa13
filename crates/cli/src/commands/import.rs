use std::fs;
use std::path::Path;

use plugfix_core::config::LoadOptions;
use plugfix_core::errors::ApplicationError;
use plugfix_core::import::parse_catalog_import;
use plugfix_db::repositories::{
    CatalogRepository, ServiceRepository, SqlCatalogRepository, SqlServiceRepository,
};

use crate::commands::{
    to_json_value, with_database, CommandOutput, CommandResult, EXIT_BAD_REQUEST,
};

/// Loads brands, models, part types and services from a JSON file. Bad
/// entries are reported and skipped; the rest is written.
pub fn run(options: &LoadOptions, path: &Path) -> CommandResult {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "import",
                "bad_request",
                format!("could not read {}: {error}", path.display()),
                EXIT_BAD_REQUEST,
            )
        }
    };

    with_database("import", options, |context| async move {
        let catalog = SqlCatalogRepository::new(context.pool.clone());
        let services = SqlServiceRepository::new(context.pool.clone());

        let known_brands = catalog.list_brands().await?;
        let batch = parse_catalog_import(&raw, &known_brands)
            .map_err(|error| ApplicationError::Import(error.to_string()))?;

        for brand in &batch.brands {
            catalog.save_brand(brand.clone()).await?;
        }
        for model in &batch.models {
            catalog.save_model(model.clone()).await?;
        }
        for part_type in &batch.part_types {
            catalog.save_part_type(part_type.clone()).await?;
        }
        for service in &batch.services {
            services.save(service.clone()).await?;
        }

        let report = batch.report();
        tracing::info!(
            event_name = "cli.import.completed",
            correlation_id = %context.correlation_id,
            accepted = batch.accepted(),
            rejected = report.rejections.len(),
            "catalog import completed"
        );

        CommandOutput::ok(
            format!(
                "imported {} entries, rejected {}",
                batch.accepted(),
                report.rejections.len()
            ),
            to_json_value(&report)?,
        )
    })
}
