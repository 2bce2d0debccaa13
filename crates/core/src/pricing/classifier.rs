//! Keyword classification of free-text service names.
//!
//! Every place that needs to know whether a service is a module/screen repair or a
//! security unlock goes through these functions.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

const MODULE_KEYWORDS: &[&str] = &["modulo", "pantalla", "screen"];
const SECURITY_UNLOCK_KEYWORDS: &[&str] = &["frp", "cuenta de google", "cuenta google"];

/// Which special formulas a service name qualifies for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFlags {
    pub is_module_service: bool,
    pub is_security_unlock_service: bool,
}

pub trait RuleClassifier: Send + Sync {
    fn classify(&self, service_name: &str) -> RuleFlags;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordRuleClassifier;

impl RuleClassifier for KeywordRuleClassifier {
    fn classify(&self, service_name: &str) -> RuleFlags {
        classify(service_name)
    }
}

pub fn classify(service_name: &str) -> RuleFlags {
    RuleFlags {
        is_module_service: classify_module_service(service_name),
        is_security_unlock_service: classify_security_unlock_service(service_name),
    }
}

/// Accent-insensitive match, so "Módulo" and "modulo" are the same service family.
pub fn classify_module_service(service_name: &str) -> bool {
    let folded = strip_diacritics(&service_name.to_lowercase());
    MODULE_KEYWORDS.iter().any(|keyword| folded.contains(keyword))
}

/// Lower-cases only; no diacritic folding.
pub fn classify_security_unlock_service(service_name: &str) -> bool {
    let lowered = service_name.to_lowercase();
    SECURITY_UNLOCK_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// NFD-decomposes `value` and drops combining diacritical marks (U+0300..=U+036F).
pub fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|ch| !('\u{0300}'..='\u{036f}').contains(ch)).collect()
}
