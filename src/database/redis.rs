use crate::config::RedisConfig;
use crate::errors::error::AppError;
use crate::log_info;
use redis::{Client as RedisClient, aio::ConnectionManager};

pub fn redis_url(config: &RedisConfig) -> String {
    match (config.username.is_empty(), config.password.is_empty()) {
        (true, true) => format!("redis://{}:{}/{}", config.host, config.port, config.db),
        (true, false) => format!(
            "redis://:{}@{}:{}/{}",
            config.password, config.host, config.port, config.db
        ),
        (false, _) => format!(
            "redis://{}:{}@{}:{}/{}",
            config.username, config.password, config.host, config.port, config.db
        ),
    }
}

/// 初始化 Redis 异步连接管理器（支持自动重连）
pub async fn create_redis_pool(config: &RedisConfig) -> Result<ConnectionManager, AppError> {
    let client = RedisClient::open(redis_url(config))?;
    let manager = ConnectionManager::new(client).await?;

    // 通过 PING 验证连接
    let mut conn = manager.clone();
    let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
    if pong != "PONG" {
        return Err(AppError::Validation(
            "Redis PING response is not PONG".to_string(),
        ));
    }

    log_info!("✅ Redis ConnectionManager initialized: {}:{}", config.host, config.port);
    Ok(manager)
}
