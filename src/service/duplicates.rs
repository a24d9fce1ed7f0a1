use indexmap::IndexMap;
use uuid::Uuid;

use crate::db::{modify_entry, CatalogRepository};
use crate::error::CatalogResult;
use crate::models::{CatalogEntry, DuplicateGroup};

/// 按规范化描述分组, 只返回至少两个条目的组 (忽略标记为非重复的条目)
///
/// 组的顺序与组内顺序都跟随 `entries` 的顺序.
pub fn duplicate_groups(entries: &[CatalogEntry]) -> Vec<DuplicateGroup> {
    let mut groups: IndexMap<&str, Vec<&CatalogEntry>> = IndexMap::new();
    for entry in entries.iter().filter(|e| !e.duplicate_ignored) {
        groups
            .entry(entry.normalized_description())
            .or_default()
            .push(entry);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(normalized, members)| DuplicateGroup {
            normalized_description: normalized.to_string(),
            entry_ids: members.iter().map(|e| e.id).collect(),
            internal_codes: members.iter().map(|e| e.internal_code().to_string()).collect(),
        })
        .collect()
}

pub async fn find_duplicate_groups(
    repository: &dyn CatalogRepository,
    tenant_id: &str,
) -> CatalogResult<Vec<DuplicateGroup>> {
    let entries = repository.list_entries(tenant_id).await?;
    let groups = duplicate_groups(&entries);
    tracing::debug!(
        "[Catalog] tenant {}: {} 个条目, {} 组疑似重复",
        tenant_id,
        entries.len(),
        groups.len()
    );
    Ok(groups)
}

/// 设置条目的"非重复"标记
pub async fn set_duplicate_ignored(
    repository: &dyn CatalogRepository,
    tenant_id: &str,
    entry_id: Uuid,
    ignored: bool,
    max_attempts: u32,
) -> CatalogResult<CatalogEntry> {
    modify_entry(
        repository,
        tenant_id,
        entry_id,
        max_attempts,
        "set duplicate flag",
        |entry| {
            if entry.duplicate_ignored == ignored {
                return false;
            }
            entry.duplicate_ignored = ignored;
            true
        },
    )
    .await
}
