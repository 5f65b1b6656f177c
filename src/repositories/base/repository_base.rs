use crate::database::diesel::{AsyncDbPool, DbConnection};
use crate::errors::error::AppError;
use diesel::result::Error as DieselError;

// 通用仓储基类：持有连接池，统一错误映射
#[derive(Clone)]
pub struct RepositoryBase {
    pool: AsyncDbPool,
}

impl RepositoryBase {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    pub async fn get_connection(&self) -> Result<DbConnection<'_>, AppError> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool(e.to_string()))
    }

    /// 转换 Diesel 查询错误
    /// NotFound 转为业务错误，唯一约束冲突带上约束信息
    pub fn map_diesel_error(&self, e: DieselError) -> AppError {
        match e {
            DieselError::NotFound => {
                AppError::NotFound("Resource not found in database".to_string())
            }
            DieselError::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, info) => {
                AppError::Internal(format!(
                    "Unique constraint violation: table={}, constraint={}, detail={}",
                    info.table_name().unwrap_or("unknown"),
                    info.constraint_name().unwrap_or("unknown"),
                    info.details().unwrap_or("no detail")
                ))
            }
            _ => AppError::DatabaseQuery(e),
        }
    }
}
