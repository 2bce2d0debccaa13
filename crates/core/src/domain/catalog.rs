use serde::{Deserialize, Serialize};

use crate::pricing::classifier::strip_diacritics;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrandId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceModelId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartTypeId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: DeviceModelId,
    pub brand_id: BrandId,
    pub name: String,
}

/// Kind of replacement part a technician can order (screen, battery, flex...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartType {
    pub id: PartTypeId,
    pub name: String,
}

/// Builds a stable identifier from a display name, e.g. `"Moto G52"` -> `"moto-g52"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in strip_diacritics(name.trim()).chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
