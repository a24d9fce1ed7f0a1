use thiserror::Error;
use uuid::Uuid;

/// 目录匹配引擎错误
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry {0} not found")]
    EntryNotFound(Uuid),

    #[error("internal code `{code}` already exists for tenant `{tenant_id}`")]
    DuplicateCode { tenant_id: String, code: String },

    #[error("catalog entry {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: Uuid, expected: i64 },

    #[error("{operation} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        last: Box<CatalogError>,
    },

    #[error("invoice line {line_id} is `{status}` and cannot be reviewed")]
    LineNotReviewable { line_id: i64, status: &'static str },

    #[error("invalid tenant matching configuration: {0}")]
    InvalidConfig(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// 并发写冲突与编码冲突可在本地重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCode { .. } | Self::VersionConflict { .. }
        )
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
