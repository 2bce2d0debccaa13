use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use plugfix_core::domain::catalog::{
    Brand, BrandId, DeviceModel, DeviceModelId, PartType, PartTypeId,
};
use plugfix_core::domain::history::{HistoryId, HistoryMetadata, HistoryRecord, NewHistoryRecord};
use plugfix_core::domain::service::{ServiceDefinition, ServiceId};
use plugfix_core::domain::shop::ShopConfig;

use super::{
    CatalogRepository, HistoryRepository, RepositoryError, ServiceRepository,
    ShopConfigRepository,
};

#[derive(Default)]
pub struct InMemoryShopConfigRepository {
    config: RwLock<Option<ShopConfig>>,
}

#[async_trait::async_trait]
impl ShopConfigRepository for InMemoryShopConfigRepository {
    async fn get(&self) -> Result<Option<ShopConfig>, RepositoryError> {
        Ok(self.config.read().await.clone())
    }

    async fn save(&self, config: ShopConfig) -> Result<(), RepositoryError> {
        *self.config.write().await = Some(config);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryServiceRepository {
    services: RwLock<HashMap<String, ServiceDefinition>>,
}

#[async_trait::async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn find_by_id(
        &self,
        id: &ServiceId,
    ) -> Result<Option<ServiceDefinition>, RepositoryError> {
        Ok(self.services.read().await.get(&id.0).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ServiceDefinition>, RepositoryError> {
        let wanted = name.trim().to_ascii_lowercase();
        let services = self.services.read().await;
        Ok(services
            .values()
            .filter(|service| service.name.trim().to_ascii_lowercase() == wanted)
            .min_by(|a, b| a.id.0.cmp(&b.id.0))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<ServiceDefinition>, RepositoryError> {
        let mut services: Vec<_> = self.services.read().await.values().cloned().collect();
        services.sort_by(|a, b| (&a.name, &a.id.0).cmp(&(&b.name, &b.id.0)));
        Ok(services)
    }

    async fn save(&self, service: ServiceDefinition) -> Result<(), RepositoryError> {
        self.services.write().await.insert(service.id.0.clone(), service);
        Ok(())
    }

    async fn delete(&self, id: &ServiceId) -> Result<bool, RepositoryError> {
        Ok(self.services.write().await.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    brands: RwLock<HashMap<String, Brand>>,
    models: RwLock<HashMap<String, DeviceModel>>,
    part_types: RwLock<HashMap<String, PartType>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let mut brands: Vec<_> = self.brands.read().await.values().cloned().collect();
        brands.sort_by(|a, b| (&a.name, &a.id.0).cmp(&(&b.name, &b.id.0)));
        Ok(brands)
    }

    async fn save_brand(&self, brand: Brand) -> Result<(), RepositoryError> {
        self.brands.write().await.insert(brand.id.0.clone(), brand);
        Ok(())
    }

    async fn delete_brand(&self, id: &BrandId) -> Result<bool, RepositoryError> {
        let removed = self.brands.write().await.remove(&id.0).is_some();
        if removed {
            self.models.write().await.retain(|_, model| model.brand_id != *id);
        }
        Ok(removed)
    }

    async fn list_models(
        &self,
        brand_id: Option<&BrandId>,
    ) -> Result<Vec<DeviceModel>, RepositoryError> {
        let mut models: Vec<_> = self
            .models
            .read()
            .await
            .values()
            .filter(|model| brand_id.map_or(true, |brand_id| model.brand_id == *brand_id))
            .cloned()
            .collect();
        models.sort_by(|a, b| {
            (&a.brand_id.0, &a.name, &a.id.0).cmp(&(&b.brand_id.0, &b.name, &b.id.0))
        });
        Ok(models)
    }

    async fn save_model(&self, model: DeviceModel) -> Result<(), RepositoryError> {
        if !self.brands.read().await.contains_key(&model.brand_id.0) {
            return Err(RepositoryError::NotFound(format!("brand {}", model.brand_id.0)));
        }
        self.models.write().await.insert(model.id.0.clone(), model);
        Ok(())
    }

    async fn delete_model(&self, id: &DeviceModelId) -> Result<bool, RepositoryError> {
        Ok(self.models.write().await.remove(&id.0).is_some())
    }

    async fn list_part_types(&self) -> Result<Vec<PartType>, RepositoryError> {
        let mut part_types: Vec<_> = self.part_types.read().await.values().cloned().collect();
        part_types.sort_by(|a, b| (&a.name, &a.id.0).cmp(&(&b.name, &b.id.0)));
        Ok(part_types)
    }

    async fn save_part_type(&self, part_type: PartType) -> Result<(), RepositoryError> {
        self.part_types.write().await.insert(part_type.id.0.clone(), part_type);
        Ok(())
    }

    async fn delete_part_type(&self, id: &PartTypeId) -> Result<bool, RepositoryError> {
        Ok(self.part_types.write().await.remove(&id.0).is_some())
    }
}

/// Keeps records in insertion order; `list` walks it backwards.
#[derive(Default)]
pub struct InMemoryHistoryRepository {
    records: RwLock<Vec<HistoryRecord>>,
}

#[async_trait::async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn append(&self, record: NewHistoryRecord) -> Result<HistoryId, RepositoryError> {
        let id = HistoryId::generate();
        let record = HistoryRecord::from_new(id.clone(), record, Utc::now());
        self.records.write().await.push(record);
        Ok(id)
    }

    async fn find_by_id(&self, id: &HistoryId) -> Result<Option<HistoryRecord>, RepositoryError> {
        Ok(self.records.read().await.iter().find(|record| record.id == *id).cloned())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit.unwrap_or(usize::MAX)).cloned().collect())
    }

    async fn update_metadata(
        &self,
        id: &HistoryId,
        metadata: HistoryMetadata,
    ) -> Result<HistoryRecord, RepositoryError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.id == *id)
            .ok_or_else(|| RepositoryError::NotFound(format!("history {}", id.0)))?;
        record.update_metadata(metadata)?;
        Ok(record.clone())
    }
}
