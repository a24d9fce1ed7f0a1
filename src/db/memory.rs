use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::repository::{CatalogRepository, LineUpdateSink};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogEntry, LineMatchUpdate};

#[derive(Debug, Default)]
struct TenantCatalog {
    /// 插入顺序即创建顺序
    entries: IndexMap<Uuid, CatalogEntry>,
    codes: HashMap<String, Uuid>,
}

/// 内存目录仓储: 每个租户一个分片, 分片锁内完成版本比较与写入
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    tenants: DashMap<String, TenantCatalog>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self, tenant_id: &str) -> usize {
        self.tenants
            .get(tenant_id)
            .map(|catalog| catalog.entries.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_entries(&self, tenant_id: &str) -> CatalogResult<Vec<CatalogEntry>> {
        Ok(self
            .tenants
            .get(tenant_id)
            .map(|catalog| catalog.entries.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_entry(&self, tenant_id: &str, id: Uuid) -> CatalogResult<Option<CatalogEntry>> {
        Ok(self
            .tenants
            .get(tenant_id)
            .and_then(|catalog| catalog.entries.get(&id).cloned()))
    }

    async fn find_by_code(
        &self,
        tenant_id: &str,
        internal_code: &str,
    ) -> CatalogResult<Option<CatalogEntry>> {
        Ok(self.tenants.get(tenant_id).and_then(|catalog| {
            catalog
                .codes
                .get(internal_code)
                .and_then(|id| catalog.entries.get(id).cloned())
        }))
    }

    async fn insert_entry(&self, entry: &CatalogEntry) -> CatalogResult<CatalogEntry> {
        let mut catalog = self.tenants.entry(entry.tenant_id.clone()).or_default();
        if catalog.codes.contains_key(entry.internal_code()) {
            return Err(CatalogError::DuplicateCode {
                tenant_id: entry.tenant_id.clone(),
                code: entry.internal_code().to_string(),
            });
        }

        let mut stored = entry.clone();
        stored.version = 1;
        catalog
            .codes
            .insert(stored.internal_code().to_string(), stored.id);
        catalog.entries.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_entry(&self, entry: &CatalogEntry) -> CatalogResult<CatalogEntry> {
        let mut catalog = self
            .tenants
            .get_mut(&entry.tenant_id)
            .ok_or(CatalogError::EntryNotFound(entry.id))?;
        let current = catalog
            .entries
            .get_mut(&entry.id)
            .ok_or(CatalogError::EntryNotFound(entry.id))?;

        if current.version != entry.version {
            return Err(CatalogError::VersionConflict {
                id: entry.id,
                expected: entry.version,
            });
        }

        let mut stored = entry.clone();
        stored.version = entry.version + 1;
        stored.updated_at = Utc::now();
        *current = stored.clone();
        Ok(stored)
    }
}

/// 内存发票行更新接收方, 保留每行最后一次更新
#[derive(Debug, Default)]
pub struct InMemoryLineUpdateSink {
    updates: DashMap<i64, LineMatchUpdate>,
}

impl InMemoryLineUpdateSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, line_id: i64) -> Option<LineMatchUpdate> {
        self.updates.get(&line_id).map(|update| update.value().clone())
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[async_trait]
impl LineUpdateSink for InMemoryLineUpdateSink {
    async fn apply_line_update(&self, update: &LineMatchUpdate) -> CatalogResult<()> {
        self.updates.insert(update.line_id, update.clone());
        Ok(())
    }
}
