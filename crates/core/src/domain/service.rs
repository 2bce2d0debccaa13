use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::classifier::{classify_module_service, classify_security_unlock_service};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub id: ServiceId,
    pub name: String,
    /// Service-specific labor price; zero means "use the shop minimum".
    #[serde(default)]
    pub base_price: Decimal,
}

impl ServiceDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_price: Decimal) -> Self {
        Self { id: ServiceId(id.into()), name: name.into(), base_price }
    }

    pub fn is_module_service(&self) -> bool {
        classify_module_service(&self.name)
    }

    pub fn is_security_unlock_service(&self) -> bool {
        classify_security_unlock_service(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::ServiceDefinition;

    #[test]
    fn service_flags_come_from_the_classifier() {
        let screen = ServiceDefinition::new("svc-1", "Cambio de Módulo", Decimal::ZERO);
        assert!(screen.is_module_service());
        assert!(!screen.is_security_unlock_service());

        let frp = ServiceDefinition::new("svc-2", "Quitar cuenta de Google", Decimal::ZERO);
        assert!(!frp.is_module_service());
        assert!(frp.is_security_unlock_service());
    }

    #[test]
    fn base_price_defaults_to_zero_when_missing_from_json() {
        let service: ServiceDefinition =
            serde_json::from_str(r#"{"id":"svc-3","name":"Pin de carga"}"#)
                .expect("service json");
        assert_eq!(service.base_price, Decimal::ZERO);
    }
}
