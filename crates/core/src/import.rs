//! Bulk catalog import from a JSON document.
//!
//! ```json
//! {
//!   "brands": [{ "name": "Samsung" }],
//!   "models": [{ "brand": "Samsung", "name": "Galaxy A52" }],
//!   "part_types": [{ "name": "Pantalla" }],
//!   "services": [{ "name": "Cambio de pantalla", "base_price": 20000 }]
//! }
//! ```
//!
//! Entries are checked one by one; a bad entry is rejected with a reason and the
//! rest of the batch still goes through.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::{
    slugify, Brand, BrandId, DeviceModel, DeviceModelId, PartType, PartTypeId,
};
use crate::domain::service::{ServiceDefinition, ServiceId};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("import document is empty")]
    Empty,
}

#[derive(Debug, Default, Deserialize)]
struct ImportDocument {
    #[serde(default)]
    brands: Vec<BrandEntry>,
    #[serde(default)]
    models: Vec<ModelEntry>,
    #[serde(default)]
    part_types: Vec<NamedEntry>,
    #[serde(default)]
    services: Vec<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
struct BrandEntry {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: Option<String>,
    /// Brand id or brand name.
    brand: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    id: Option<String>,
    name: String,
    #[serde(default)]
    base_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRejection {
    pub section: String,
    pub index: usize,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub brands: Vec<Brand>,
    pub models: Vec<DeviceModel>,
    pub part_types: Vec<PartType>,
    pub services: Vec<ServiceDefinition>,
    pub rejections: Vec<ImportRejection>,
}

impl ImportBatch {
    pub fn accepted(&self) -> usize {
        self.brands.len() + self.models.len() + self.part_types.len() + self.services.len()
    }

    pub fn report(&self) -> ImportReport {
        ImportReport {
            brands: self.brands.len(),
            models: self.models.len(),
            part_types: self.part_types.len(),
            services: self.services.len(),
            rejections: self.rejections.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub brands: usize,
    pub models: usize,
    pub part_types: usize,
    pub services: usize,
    pub rejections: Vec<ImportRejection>,
}

/// Parses and checks an import document. `known_brands` are brands already
/// stored, so models may reference them without re-listing the brand.
pub fn parse_catalog_import(
    raw: &str,
    known_brands: &[Brand],
) -> Result<ImportBatch, ImportError> {
    if raw.trim().is_empty() {
        return Err(ImportError::Empty);
    }

    let document: ImportDocument = serde_json::from_str(raw)?;
    let mut batch = ImportBatch::default();

    let mut seen = HashSet::new();
    for (index, entry) in document.brands.into_iter().enumerate() {
        match named_id("brands", index, entry.id.as_deref(), &entry.name, &mut seen) {
            Ok((id, name)) => batch.brands.push(Brand { id: BrandId(id), name }),
            Err(rejection) => batch.rejections.push(rejection),
        }
    }

    let mut seen = HashSet::new();
    for (index, entry) in document.models.into_iter().enumerate() {
        let Some(brand_id) = resolve_brand(&entry.brand, &batch.brands, known_brands) else {
            batch.rejections.push(rejection(
                "models",
                index,
                format!("unknown brand `{}`", entry.brand.trim()),
            ));
            continue;
        };

        let fallback_id = format!("{} {}", brand_id.0, entry.name);
        let id = entry.id.as_deref().map(str::to_owned).unwrap_or(fallback_id);
        match named_id("models", index, Some(&id), &entry.name, &mut seen) {
            Ok((id, name)) => {
                batch.models.push(DeviceModel { id: DeviceModelId(id), brand_id, name })
            }
            Err(rejection) => batch.rejections.push(rejection),
        }
    }

    let mut seen = HashSet::new();
    for (index, entry) in document.part_types.into_iter().enumerate() {
        match named_id("part_types", index, entry.id.as_deref(), &entry.name, &mut seen) {
            Ok((id, name)) => batch.part_types.push(PartType { id: PartTypeId(id), name }),
            Err(rejection) => batch.rejections.push(rejection),
        }
    }

    let mut seen = HashSet::new();
    for (index, entry) in document.services.into_iter().enumerate() {
        if entry.base_price < Decimal::ZERO {
            batch.rejections.push(rejection(
                "services",
                index,
                format!("base price cannot be negative (got {})", entry.base_price),
            ));
            continue;
        }

        match named_id("services", index, entry.id.as_deref(), &entry.name, &mut seen) {
            Ok((id, name)) => batch.services.push(ServiceDefinition {
                id: ServiceId(id),
                name,
                base_price: entry.base_price,
            }),
            Err(rejection) => batch.rejections.push(rejection),
        }
    }

    Ok(batch)
}

fn named_id(
    section: &str,
    index: usize,
    explicit_id: Option<&str>,
    name: &str,
    seen: &mut HashSet<String>,
) -> Result<(String, String), ImportRejection> {
    let name = name.trim();
    if name.is_empty() {
        return Err(rejection(section, index, "name is required".to_owned()));
    }

    let id = slugify(explicit_id.unwrap_or(name));
    if id.is_empty() {
        return Err(rejection(section, index, format!("cannot derive an id from `{name}`")));
    }

    if !seen.insert(id.clone()) {
        return Err(rejection(section, index, format!("duplicate entry `{id}` in this import")));
    }

    Ok((id, name.to_owned()))
}

fn resolve_brand(reference: &str, batch: &[Brand], known: &[Brand]) -> Option<BrandId> {
    let reference = reference.trim();
    let slug = slugify(reference);
    batch
        .iter()
        .chain(known.iter())
        .find(|brand| brand.id.0 == slug || brand.name.eq_ignore_ascii_case(reference))
        .map(|brand| brand.id.clone())
}

fn rejection(section: &str, index: usize, reason: String) -> ImportRejection {
    ImportRejection { section: section.to_owned(), index, reason }
}
