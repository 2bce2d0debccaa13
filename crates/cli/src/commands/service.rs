use clap::{Args, Subcommand};
use plugfix_core::config::LoadOptions;
use plugfix_core::domain::catalog::slugify;
use plugfix_core::domain::service::{ServiceDefinition, ServiceId};
use plugfix_core::errors::{ApplicationError, DomainError};
use plugfix_db::repositories::{ServiceRepository, SqlServiceRepository};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::commands::{with_database, CommandOutput, CommandResult};

#[derive(Debug, Subcommand)]
pub enum ServiceCommand {
    #[command(about = "Add a service or update the one with the same id")]
    Add(AddServiceArgs),
    #[command(about = "List stored services with the pricing rule each one triggers")]
    List,
    #[command(about = "Remove a stored service")]
    Remove {
        #[arg(help = "Service id")]
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct AddServiceArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, help = "Defaults to a slug of the name")]
    pub id: Option<String>,
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub base_price: Decimal,
}

impl AddServiceArgs {
    pub fn to_definition(&self) -> Result<ServiceDefinition, DomainError> {
        let name = self.name.trim();
        let id = slugify(self.id.as_deref().unwrap_or(name));
        let mut problems = Vec::new();
        if name.is_empty() || id.is_empty() {
            problems.push("Service name is required".to_owned());
        }
        if self.base_price < Decimal::ZERO {
            problems.push("Service base price cannot be negative".to_owned());
        }
        if !problems.is_empty() {
            return Err(DomainError::InvalidParameters(problems));
        }

        Ok(ServiceDefinition::new(id, name, self.base_price))
    }
}

fn describe(service: &ServiceDefinition) -> Value {
    json!({
        "id": service.id.0,
        "name": service.name,
        "base_price": service.base_price,
        "is_module_service": service.is_module_service(),
        "is_security_unlock_service": service.is_security_unlock_service(),
    })
}

pub fn run(options: &LoadOptions, command: ServiceCommand) -> CommandResult {
    match command {
        ServiceCommand::Add(args) => with_database("service", options, |context| async move {
            let service = args.to_definition()?;
            SqlServiceRepository::new(context.pool.clone()).save(service.clone()).await?;
            CommandOutput::ok(format!("saved service `{}`", service.id.0), describe(&service))
        }),
        ServiceCommand::List => with_database("service", options, |context| async move {
            let services = SqlServiceRepository::new(context.pool.clone()).list().await?;
            CommandOutput::ok(
                format!("{} services", services.len()),
                Value::Array(services.iter().map(describe).collect()),
            )
        }),
        ServiceCommand::Remove { id } => with_database("service", options, |context| async move {
            let removed = SqlServiceRepository::new(context.pool.clone())
                .delete(&ServiceId(id.clone()))
                .await?;
            if !removed {
                return Err(ApplicationError::from(DomainError::InvariantViolation(format!(
                    "no service with id `{id}`"
                ))));
            }
            CommandOutput::ok(format!("removed service `{id}`"), json!({ "id": id }))
        }),
    }
}

#[cfg(test)]
mod tests {
    use plugfix_core::errors::DomainError;
    use rust_decimal::Decimal;

    use super::AddServiceArgs;

    #[test]
    fn id_defaults_to_slug_of_name() {
        let args = AddServiceArgs {
            name: " Cambio de Batería ".to_owned(),
            id: None,
            base_price: Decimal::from(15_000),
        };

        let service = args.to_definition().expect("valid service");
        assert_eq!(service.id.0, "cambio-de-bateria");
        assert_eq!(service.name, "Cambio de Batería");
    }

    #[test]
    fn blank_name_and_negative_price_are_both_reported() {
        let args = AddServiceArgs { name: " ".to_owned(), id: None, base_price: Decimal::from(-5) };

        assert_eq!(
            args.to_definition(),
            Err(DomainError::InvalidParameters(vec![
                "Service name is required".to_owned(),
                "Service base price cannot be negative".to_owned(),
            ]))
        );
    }
}
