use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::config::network_config::NetworkConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub indexer: IndexerConfig,
    pub scan: ScanConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// 未识别的 chain id 回落到该网络
    pub default_chain_id: u64,
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

/// PostgreSQL 连接配置（结构化管理）
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
    // 连接池优化参数
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub db: i64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// PostgreSQL 持久化 + Redis 代币元数据缓存
    Postgres,
    /// 进程内缓存（本地开发、测试）
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// 代币元数据缓存有效期（秒）
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexerConfig {
    pub base_url: String,
    /// 为空时跳过索引器，直接走区块扫描
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// 区块扫描兜底策略的时间/数量预算
#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    pub max_blocks: u64,
    pub budget_secs: u64,
    pub block_number_timeout_secs: u64,
    pub block_timeout_ms: u64,
    pub receipt_timeout_ms: u64,
}

impl ScanConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }

    pub fn block_number_timeout(&self) -> Duration {
        Duration::from_secs(self.block_number_timeout_secs)
    }

    pub fn block_timeout(&self) -> Duration {
        Duration::from_millis(self.block_timeout_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_blocks: 100,
            budget_secs: 20,
            block_number_timeout_secs: 30,
            block_timeout_ms: 3000,
            receipt_timeout_ms: 2500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// 单次同步拉取的交易上限
    pub limit: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RefreshConfig {
    /// 0 表示关闭定时刷新
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default)]
    pub chain_ids: Vec<u64>,
}

impl RefreshConfig {
    pub fn enabled(&self) -> bool {
        self.interval_secs > 0 && !self.chain_ids.is_empty()
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // .env 不存在时忽略
        let _ = dotenvy::dotenv();
        let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let mut config: Config = config::Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        // 兼容常见的 ETHERSCAN_API_KEY 环境变量
        if config.indexer.api_key.as_deref().is_none_or(str::is_empty) {
            config.indexer.api_key = std::env::var("ETHERSCAN_API_KEY").ok();
        }
        Ok(config)
    }
}
