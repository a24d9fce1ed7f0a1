use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogEntry, LineMatchUpdate};

/// 写操作超时
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS catalog_entries (
        id UUID PRIMARY KEY,
        tenant_id VARCHAR(64) NOT NULL,
        internal_code VARCHAR(64) NOT NULL,
        normalized_description TEXT NOT NULL,
        approval_status VARCHAR(16) NOT NULL,
        duplicate_ignored BOOLEAN NOT NULL DEFAULT FALSE,
        document JSONB NOT NULL,
        version BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT uq_catalog_entries_tenant_code UNIQUE (tenant_id, internal_code)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_catalog_entries_tenant_normalized
        ON catalog_entries (tenant_id, normalized_description)
    "#,
];

/// 目录表行: 索引列 + 完整条目文档
#[derive(Debug, FromRow)]
struct CatalogEntryRow {
    document: Json<CatalogEntry>,
    version: i64,
}

impl CatalogEntryRow {
    fn into_entry(self) -> CatalogEntry {
        let mut entry = self.document.0;
        entry.version = self.version;
        entry
    }
}

/// 建表 (幂等)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// 查询租户全部条目 (按创建顺序)
pub async fn list_entries(pool: &PgPool, tenant_id: &str) -> CatalogResult<Vec<CatalogEntry>> {
    let rows = sqlx::query_as::<_, CatalogEntryRow>(
        r#"
        SELECT document, version
        FROM catalog_entries
        WHERE tenant_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CatalogEntryRow::into_entry).collect())
}

/// 按ID查询条目
pub async fn get_entry(
    pool: &PgPool,
    tenant_id: &str,
    id: Uuid,
) -> CatalogResult<Option<CatalogEntry>> {
    let row = sqlx::query_as::<_, CatalogEntryRow>(
        r#"
        SELECT document, version
        FROM catalog_entries
        WHERE tenant_id = $1 AND id = $2
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CatalogEntryRow::into_entry))
}

/// 按内部编码查询条目
pub async fn find_by_code(
    pool: &PgPool,
    tenant_id: &str,
    internal_code: &str,
) -> CatalogResult<Option<CatalogEntry>> {
    let row = sqlx::query_as::<_, CatalogEntryRow>(
        r#"
        SELECT document, version
        FROM catalog_entries
        WHERE tenant_id = $1 AND internal_code = $2
        "#,
    )
    .bind(tenant_id)
    .bind(internal_code)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CatalogEntryRow::into_entry))
}

async fn with_timeout<T>(
    operation: impl std::future::Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, sqlx::Error> {
    match tokio::time::timeout(WRITE_TIMEOUT, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("✗ 写操作超时 (>{:?})!", WRITE_TIMEOUT);
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// 插入新条目, 编码冲突映射为 DuplicateCode
pub async fn insert_entry(pool: &PgPool, entry: &CatalogEntry) -> CatalogResult<CatalogEntry> {
    let mut stored = entry.clone();
    stored.version = 1;

    let result = with_timeout(
        sqlx::query(
            r#"
            INSERT INTO catalog_entries (
                id, tenant_id, internal_code, normalized_description,
                approval_status, duplicate_ignored, document, version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(stored.id)
        .bind(&stored.tenant_id)
        .bind(stored.internal_code())
        .bind(stored.normalized_description())
        .bind(stored.approval_status.as_str())
        .bind(stored.duplicate_ignored)
        .bind(Json(&stored))
        .bind(stored.version)
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .execute(pool),
    )
    .await;

    match result {
        Ok(_) => Ok(stored),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(CatalogError::DuplicateCode {
                tenant_id: stored.tenant_id.clone(),
                code: stored.internal_code().to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// 乐观并发更新: 仅当库中版本与条目版本一致时写入
pub async fn update_entry(pool: &PgPool, entry: &CatalogEntry) -> CatalogResult<CatalogEntry> {
    let mut stored = entry.clone();
    stored.version = entry.version + 1;
    stored.updated_at = chrono::Utc::now();

    let result = with_timeout(
        sqlx::query(
            r#"
            UPDATE catalog_entries
            SET normalized_description = $1,
                approval_status = $2,
                duplicate_ignored = $3,
                document = $4,
                version = $5,
                updated_at = $6
            WHERE tenant_id = $7 AND id = $8 AND version = $9
            "#,
        )
        .bind(stored.normalized_description())
        .bind(stored.approval_status.as_str())
        .bind(stored.duplicate_ignored)
        .bind(Json(&stored))
        .bind(stored.version)
        .bind(stored.updated_at)
        .bind(&stored.tenant_id)
        .bind(stored.id)
        .bind(entry.version)
        .execute(pool),
    )
    .await?;

    if result.rows_affected() == 0 {
        return match get_entry(pool, &entry.tenant_id, entry.id).await? {
            Some(_) => Err(CatalogError::VersionConflict {
                id: entry.id,
                expected: entry.version,
            }),
            None => Err(CatalogError::EntryNotFound(entry.id)),
        };
    }

    Ok(stored)
}

/// 回写发票行匹配投影
pub async fn update_line_projection(pool: &PgPool, update: &LineMatchUpdate) -> CatalogResult<()> {
    let result = with_timeout(
        sqlx::query(
            r#"
            UPDATE invoice_line_items
            SET matching_status = $1,
                match_confidence = $2,
                matched_catalog_entry_id = $3,
                matching_method = $4,
                matched_internal_code = $5,
                review_suggestion = $6,
                matching_notes = $7,
                reviewed_by = $8,
                reviewed_at = $9,
                updated_at = now()
            WHERE id = $10
            "#,
        )
        .bind(update.matching_status.as_str())
        .bind(update.match_confidence)
        .bind(update.matched_catalog_entry_id)
        .bind(update.matching_method.map(|m| m.as_str()))
        .bind(update.internal_code.as_deref())
        .bind(update.suggestion.as_ref().map(Json))
        .bind(update.notes.as_deref())
        .bind(update.reviewed_by.as_deref())
        .bind(update.reviewed_at)
        .bind(update.line_id)
        .execute(pool),
    )
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(
            "发票 {} 行 {} (id {}) 不存在, 匹配结果未回写",
            update.invoice_id,
            update.line_number,
            update.line_id
        );
    }
    Ok(())
}
