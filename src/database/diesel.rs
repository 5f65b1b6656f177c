use crate::config::DatabaseConfig;
use crate::errors::error::AppError;
use diesel_async::pg::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use std::time::Duration;

// 定义异步池类型
pub type AsyncDbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'a> = PooledConnection<'a, AsyncPgConnection>;

pub fn database_url(config: &DatabaseConfig) -> String {
    format!(
        "postgresql://{}:{}@{}:{}/{}",
        config.username, config.password, config.host, config.port, config.database_name
    )
}

pub async fn create_async_db_pool(config: &DatabaseConfig) -> Result<AsyncDbPool, AppError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url(config));
    let pool = Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_connections))
        .connection_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .build(manager)
        .await
        .map_err(|e| AppError::ConnectionPool(e.to_string()))?;

    Ok(pool)
}
