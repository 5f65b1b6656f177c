use diesel::result::Error as DieselError;
use ethers_providers::ProviderError;
use redis::RedisError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    // 捕获所有 SQL 执行、ORM 映射错误
    #[error("Database query error: {0}")]
    DatabaseQuery(#[from] DieselError),

    // 从连接池获取连接失败
    #[error("Database connection pool error: {0}")]
    ConnectionPool(String),

    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Join error: {0}")]
    JoinError(#[from] JoinError),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("配置错误: {0}")]
    Config(String),

    /// 类型转换错误（U256→i64、单位换算等）
    #[error("类型转换错误: {0}")]
    Conversion(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 资源未找到（缓存与链上都不存在）
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 内部不可预期错误（兜底）
    #[error("内部错误: {0}")]
    Internal(String),

    #[error("无效的tx_hash: {0}")]
    InvalidTxHash(String),

    #[error("无效的地址: {0}")]
    InvalidAddress(String),

    #[error("无效的provider: {0}")]
    ProviderError(String),

    #[error("索引器错误: {0}")]
    Indexer(String),

    #[error("调用超时: {0}")]
    Timeout(String),
}

impl AppError {
    pub fn new(message: &str) -> Self {
        AppError::Internal(message.to_string())
    }

    /// 输入校验类错误，调用方应当作客户端错误处理
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::InvalidAddress(_) | AppError::InvalidTxHash(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::ProviderError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<::config::ConfigError> for AppError {
    fn from(err: ::config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(err.to_string())
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::Conversion(err.to_string())
    }
}
