use chrono::Utc;
use uuid::Uuid;

use crate::db::{modify_entry, CatalogRepository};
use crate::error::CatalogResult;
use crate::models::{AlternativeDescription, CatalogEntry, DescriptionProvenance};
use crate::service::normalizer::normalize_description;

/// 非原始来源别名的固定置信度
///
/// 已知简化: 不随产生该别名的匹配置信度变化.
pub const DEFAULT_ALTERNATIVE_CONFIDENCE: f64 = 0.8;

/// 把一条描述并入条目的别名表
///
/// 规范化文本已存在时频次 +1 并刷新 `last_seen_at`, 否则追加新记录.
/// 返回 `true` 表示新增了记录; 空描述忽略并返回 `false`.
pub fn merge_alternative(
    entry: &mut CatalogEntry,
    text: &str,
    provenance: DescriptionProvenance,
    added_by: Option<&str>,
) -> bool {
    let normalized = normalize_description(text);
    if normalized.is_empty() {
        return false;
    }

    let now = Utc::now();
    entry.updated_at = now;

    if let Some(existing) = entry.alternative_descriptions.get_mut(&normalized) {
        existing.frequency += 1;
        existing.last_seen_at = now;
        return false;
    }

    let confidence = match provenance {
        DescriptionProvenance::Original => 1.0,
        _ => DEFAULT_ALTERNATIVE_CONFIDENCE,
    };
    entry.alternative_descriptions.insert(
        normalized.clone(),
        AlternativeDescription {
            text: text.trim().to_string(),
            normalized_text: normalized,
            provenance,
            frequency: 1,
            last_seen_at: now,
            confidence,
            added_by: added_by.map(str::to_string),
        },
    );
    true
}

/// 登记别名并持久化, 版本冲突时重新读取后重试
pub async fn add_alternative_description(
    repository: &dyn CatalogRepository,
    tenant_id: &str,
    entry_id: Uuid,
    text: &str,
    provenance: DescriptionProvenance,
    added_by: Option<&str>,
    max_attempts: u32,
) -> CatalogResult<CatalogEntry> {
    let blank = normalize_description(text).is_empty();
    modify_entry(
        repository,
        tenant_id,
        entry_id,
        max_attempts,
        "register alternative description",
        |entry| {
            if blank {
                return false;
            }
            merge_alternative(entry, text, provenance, added_by);
            true
        },
    )
    .await
}
