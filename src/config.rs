use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub matching: MatchingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 获取连接的超时 (秒)
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// 超过该耗时的语句记 warn 日志 (毫秒)
    #[serde(default = "default_slow_statement_ms")]
    pub slow_statement_ms: u64,
}

/// 匹配引擎参数 (与租户配置无关的进程级参数)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// 每行最多保留的候选数
    pub search_limit: usize,
    /// 启用阶段1时候选的最低置信度 (低于此值视为无匹配)
    pub review_floor: f64,
    /// 未启用阶段1 (旧模式) 时判定"存在匹配"的置信度
    pub legacy_threshold: f64,
    /// 新建目录条目时编码冲突的最大尝试次数
    pub create_attempts: u32,
    /// 价格合并时版本冲突的最大尝试次数
    pub consolidation_attempts: u32,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            search_limit: 5,
            review_floor: 0.5,
            legacy_threshold: 0.7,
            create_attempts: 3,
            consolidation_attempts: 5,
        }
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_slow_statement_ms() -> u64 {
    5000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/catalog_match".to_string(),
                max_connections: default_max_connections(),
                acquire_timeout_secs: default_acquire_timeout_secs(),
                slow_statement_ms: default_slow_statement_ms(),
            },
            matching: MatchingSettings::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> catalog-match.{toml,json,yaml} -> CATALOG__* 环境变量 -> DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )?
            .set_default(
                "database.acquire_timeout_secs",
                defaults.database.acquire_timeout_secs as i64,
            )?
            .set_default(
                "database.slow_statement_ms",
                defaults.database.slow_statement_ms as i64,
            )?
            .add_source(File::with_name("catalog-match").required(false))
            .add_source(Environment::with_prefix("CATALOG").separator("__"))
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
    }
}
