use clap::{Args, Subcommand};
use plugfix_core::config::LoadOptions;
use plugfix_core::domain::catalog::{
    slugify, Brand, BrandId, DeviceModel, DeviceModelId, PartType, PartTypeId,
};
use plugfix_core::errors::{ApplicationError, DomainError};
use plugfix_db::repositories::{CatalogRepository, SqlCatalogRepository};
use serde_json::json;

use crate::commands::{to_json_value, with_database, CommandOutput, CommandResult};

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    #[command(subcommand, about = "Manage device brands")]
    Brand(EntryCommand),
    #[command(subcommand, about = "Manage device models")]
    Model(ModelCommand),
    #[command(subcommand, about = "Manage part types")]
    PartType(EntryCommand),
}

/// Brands and part types share the same add/list/remove shape.
#[derive(Debug, Subcommand)]
pub enum EntryCommand {
    #[command(about = "Add an entry or rename the one with the same id")]
    Add(NamedArgs),
    List,
    Remove {
        #[arg(help = "Entry id")]
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ModelCommand {
    #[command(about = "Add a model under a stored brand")]
    Add(AddModelArgs),
    List {
        #[arg(long, help = "Only models of this brand (id or name)")]
        brand: Option<String>,
    },
    Remove {
        #[arg(help = "Model id")]
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct NamedArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, help = "Defaults to a slug of the name")]
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddModelArgs {
    #[arg(long, help = "Brand id or name")]
    pub brand: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, help = "Defaults to a slug of brand and name")]
    pub id: Option<String>,
}

impl NamedArgs {
    fn id_and_name(&self, what: &str) -> Result<(String, String), DomainError> {
        let name = self.name.trim();
        let id = slugify(self.id.as_deref().unwrap_or(name));
        if name.is_empty() || id.is_empty() {
            return Err(DomainError::InvalidParameters(vec![format!("{what} name is required")]));
        }
        Ok((id, name.to_owned()))
    }
}

pub fn run(options: &LoadOptions, command: CatalogCommand) -> CommandResult {
    with_database("catalog", options, |context| async move {
        let repository = SqlCatalogRepository::new(context.pool.clone());
        execute(&repository, command).await
    })
}

/// Runs a catalog command against any repository.
pub async fn execute<R>(
    repository: &R,
    command: CatalogCommand,
) -> Result<CommandOutput, ApplicationError>
where
    R: CatalogRepository + ?Sized,
{
    match command {
        CatalogCommand::Brand(EntryCommand::Add(args)) => {
            let (id, name) = args.id_and_name("Brand")?;
            let brand = Brand { id: BrandId(id), name };
            repository.save_brand(brand.clone()).await?;
            CommandOutput::ok(format!("saved brand `{}`", brand.id.0), to_json_value(&brand)?)
        }
        CatalogCommand::Brand(EntryCommand::List) => {
            let brands = repository.list_brands().await?;
            CommandOutput::ok(format!("{} brands", brands.len()), to_json_value(&brands)?)
        }
        CatalogCommand::Brand(EntryCommand::Remove { id }) => {
            let models = repository.list_models(Some(&BrandId(id.clone()))).await?;
            if !repository.delete_brand(&BrandId(id.clone())).await? {
                return Err(missing("brand", &id));
            }
            CommandOutput::ok(
                format!("removed brand `{id}` and {} models", models.len()),
                json!({ "id": id, "models_removed": models.len() }),
            )
        }
        CatalogCommand::Model(ModelCommand::Add(args)) => {
            let brands = repository.list_brands().await?;
            let brand_id = resolve_brand(&args.brand, &brands)
                .ok_or_else(|| missing("brand", args.brand.trim()))?;
            let name = args.name.trim();
            let fallback_id = format!("{} {name}", brand_id.0);
            let id = slugify(args.id.as_deref().unwrap_or(&fallback_id));
            if name.is_empty() || id.is_empty() {
                return Err(DomainError::InvalidParameters(vec![
                    "Model name is required".to_owned()
                ])
                .into());
            }

            let model = DeviceModel { id: DeviceModelId(id), brand_id, name: name.to_owned() };
            repository.save_model(model.clone()).await?;
            CommandOutput::ok(format!("saved model `{}`", model.id.0), to_json_value(&model)?)
        }
        CatalogCommand::Model(ModelCommand::List { brand }) => {
            let brand_id = match brand {
                Some(reference) => {
                    let brands = repository.list_brands().await?;
                    Some(
                        resolve_brand(&reference, &brands)
                            .ok_or_else(|| missing("brand", reference.trim()))?,
                    )
                }
                None => None,
            };
            let models = repository.list_models(brand_id.as_ref()).await?;
            CommandOutput::ok(format!("{} models", models.len()), to_json_value(&models)?)
        }
        CatalogCommand::Model(ModelCommand::Remove { id }) => {
            if !repository.delete_model(&DeviceModelId(id.clone())).await? {
                return Err(missing("model", &id));
            }
            CommandOutput::ok(format!("removed model `{id}`"), json!({ "id": id }))
        }
        CatalogCommand::PartType(EntryCommand::Add(args)) => {
            let (id, name) = args.id_and_name("Part type")?;
            let part_type = PartType { id: PartTypeId(id), name };
            repository.save_part_type(part_type.clone()).await?;
            CommandOutput::ok(
                format!("saved part type `{}`", part_type.id.0),
                to_json_value(&part_type)?,
            )
        }
        CatalogCommand::PartType(EntryCommand::List) => {
            let part_types = repository.list_part_types().await?;
            CommandOutput::ok(format!("{} part types", part_types.len()), to_json_value(&part_types)?)
        }
        CatalogCommand::PartType(EntryCommand::Remove { id }) => {
            if !repository.delete_part_type(&PartTypeId(id.clone())).await? {
                return Err(missing("part type", &id));
            }
            CommandOutput::ok(format!("removed part type `{id}`"), json!({ "id": id }))
        }
    }
}

fn resolve_brand(reference: &str, brands: &[Brand]) -> Option<BrandId> {
    let reference = reference.trim();
    let slug = slugify(reference);
    brands
        .iter()
        .find(|brand| brand.id.0 == slug || brand.name.eq_ignore_ascii_case(reference))
        .map(|brand| brand.id.clone())
}

fn missing(what: &str, id: &str) -> ApplicationError {
    DomainError::InvariantViolation(format!("no {what} with id `{id}`")).into()
}
