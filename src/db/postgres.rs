use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::queries;
use crate::db::repository::{CatalogRepository, LineUpdateSink};
use crate::error::CatalogResult;
use crate::models::{CatalogEntry, LineMatchUpdate};

/// 创建数据库连接池 (慢语句按配置阈值记 warn)
pub async fn create_pool(database: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let connect_options = PgConnectOptions::from_str(&database.url)?.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_millis(database.slow_statement_ms),
    );

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.acquire_timeout_secs))
        .connect_with(connect_options)
        .await?;
    tracing::info!(
        "[Catalog] 连接池就绪 (max_connections {})",
        database.max_connections
    );
    Ok(pool)
}

/// PostgreSQL 目录仓储
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_entries(&self, tenant_id: &str) -> CatalogResult<Vec<CatalogEntry>> {
        queries::list_entries(&self.pool, tenant_id).await
    }

    async fn get_entry(&self, tenant_id: &str, id: Uuid) -> CatalogResult<Option<CatalogEntry>> {
        queries::get_entry(&self.pool, tenant_id, id).await
    }

    async fn find_by_code(
        &self,
        tenant_id: &str,
        internal_code: &str,
    ) -> CatalogResult<Option<CatalogEntry>> {
        queries::find_by_code(&self.pool, tenant_id, internal_code).await
    }

    async fn insert_entry(&self, entry: &CatalogEntry) -> CatalogResult<CatalogEntry> {
        queries::insert_entry(&self.pool, entry).await
    }

    async fn update_entry(&self, entry: &CatalogEntry) -> CatalogResult<CatalogEntry> {
        queries::update_entry(&self.pool, entry).await
    }
}

/// 回写 `invoice_line_items` 表的行更新接收方
#[derive(Clone)]
pub struct PgLineUpdateSink {
    pool: PgPool,
}

impl PgLineUpdateSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LineUpdateSink for PgLineUpdateSink {
    async fn apply_line_update(&self, update: &LineMatchUpdate) -> CatalogResult<()> {
        queries::update_line_projection(&self.pool, update).await
    }
}
