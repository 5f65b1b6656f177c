use crate::errors::error::AppError;
use crate::models::TokenMetadata;
use crate::repositories::traits::repository::TokenCache;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use tokio::sync::RwLock;

fn cache_key(chain_id: u64, contract: &str) -> String {
    format!("token_meta:{}:{}", chain_id, contract.to_lowercase())
}

/// Redis 代币元数据缓存，值为 JSON，带过期时间
#[derive(Clone)]
pub struct RedisTokenCache {
    manager: ConnectionManager,
    ttl_secs: u64,
}

impl RedisTokenCache {
    pub fn new(manager: ConnectionManager, ttl_secs: u64) -> Self {
        Self { manager, ttl_secs }
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get(&self, chain_id: u64, contract: &str) -> Result<Option<TokenMetadata>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(cache_key(chain_id, contract)).await?;
        raw.map(|s| serde_json::from_str(&s).map_err(AppError::from))
            .transpose()
    }

    async fn put(
        &self,
        chain_id: u64,
        contract: &str,
        metadata: &TokenMetadata,
    ) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let value = serde_json::to_string(metadata)?;
        let _: () = conn
            .set_ex(cache_key(chain_id, contract), value, self.ttl_secs)
            .await?;
        Ok(())
    }
}

/// 进程内代币元数据缓存（不过期）
#[derive(Default)]
pub struct MemoryTokenCache {
    entries: RwLock<HashMap<String, TokenMetadata>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, chain_id: u64, contract: &str) -> Result<Option<TokenMetadata>, AppError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&cache_key(chain_id, contract))
            .cloned())
    }

    async fn put(
        &self,
        chain_id: u64,
        contract: &str,
        metadata: &TokenMetadata,
    ) -> Result<(), AppError> {
        self.entries
            .write()
            .await
            .insert(cache_key(chain_id, contract), metadata.clone());
        Ok(())
    }
}
