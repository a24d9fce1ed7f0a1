use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogEntry, LineMatchUpdate};

/// 按租户隔离的目录仓储
///
/// 所有写入都是整条目写入: `insert_entry` 保证 (租户, 内部编码) 唯一,
/// `update_entry` 以条目上的 `version` 做乐观并发校验, 成功后版本 +1.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// 租户的全部条目, 按创建顺序
    async fn list_entries(&self, tenant_id: &str) -> CatalogResult<Vec<CatalogEntry>>;

    async fn get_entry(&self, tenant_id: &str, id: Uuid) -> CatalogResult<Option<CatalogEntry>>;

    async fn find_by_code(
        &self,
        tenant_id: &str,
        internal_code: &str,
    ) -> CatalogResult<Option<CatalogEntry>>;

    /// 编码已存在时返回 `CatalogError::DuplicateCode`
    async fn insert_entry(&self, entry: &CatalogEntry) -> CatalogResult<CatalogEntry>;

    /// 版本不一致时返回 `CatalogError::VersionConflict`
    async fn update_entry(&self, entry: &CatalogEntry) -> CatalogResult<CatalogEntry>;
}

/// 发票行匹配结果的接收方
#[async_trait]
pub trait LineUpdateSink: Send + Sync {
    async fn apply_line_update(&self, update: &LineMatchUpdate) -> CatalogResult<()>;
}

/// 读取-修改-写回, 版本冲突时重新读取后重试
///
/// `mutate` 返回 `false` 表示无需写入, 直接返回读到的条目.
pub async fn modify_entry<F>(
    repository: &dyn CatalogRepository,
    tenant_id: &str,
    entry_id: Uuid,
    max_attempts: u32,
    operation: &'static str,
    mut mutate: F,
) -> CatalogResult<CatalogEntry>
where
    F: FnMut(&mut CatalogEntry) -> bool + Send,
{
    let attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        let mut entry = repository
            .get_entry(tenant_id, entry_id)
            .await?
            .ok_or(CatalogError::EntryNotFound(entry_id))?;

        if !mutate(&mut entry) {
            return Ok(entry);
        }

        match repository.update_entry(&entry).await {
            Ok(stored) => return Ok(stored),
            Err(err) if err.is_retryable() => {
                tracing::warn!(
                    "[Catalog] {} 条目 {} 并发写冲突, 第 {}/{} 次: {}",
                    operation,
                    entry_id,
                    attempt,
                    attempts,
                    err
                );
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(CatalogError::RetriesExhausted {
        operation,
        attempts,
        last: Box::new(last_error.unwrap_or(CatalogError::EntryNotFound(entry_id))),
    })
}
