use plugfix_core::pricing::classifier::{KeywordRuleClassifier, RuleClassifier};
use serde_json::json;

use crate::commands::{CommandResult, EXIT_BAD_REQUEST};

/// Shows which pricing rule a service name would trigger. Needs no database.
pub fn run(service_name: &str) -> CommandResult {
    if service_name.trim().is_empty() {
        return CommandResult::failure(
            "classify",
            "bad_request",
            "service name must not be empty",
            EXIT_BAD_REQUEST,
        );
    }

    let flags = KeywordRuleClassifier.classify(service_name);
    let rule = if flags.is_module_service {
        "module_repair"
    } else if flags.is_security_unlock_service {
        "security_unlock"
    } else {
        "standard"
    };

    CommandResult::success(
        "classify",
        format!("`{}` prices with the {rule} rule", service_name.trim()),
        json!({
            "service_name": service_name,
            "is_module_service": flags.is_module_service,
            "is_security_unlock_service": flags.is_security_unlock_service,
            "rule": rule,
        }),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::run;

    fn data(name: &str) -> Value {
        let payload: Value = serde_json::from_str(&run(name).output).expect("json");
        payload["data"].clone()
    }

    #[test]
    fn accented_module_names_match() {
        let data = data("Cambio de Módulo");
        assert_eq!(data["is_module_service"], true);
        assert_eq!(data["rule"], "module_repair");
    }

    #[test]
    fn names_matching_both_rules_report_module_first() {
        let data = data("Pantalla + FRP");
        assert_eq!(data["is_module_service"], true);
        assert_eq!(data["is_security_unlock_service"], true);
        assert_eq!(data["rule"], "module_repair");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(run("   ").exit_code, super::EXIT_BAD_REQUEST);
    }
}
