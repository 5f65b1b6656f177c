use crate::errors::error::AppError;
use crate::models::{TokenMetadata, TransactionRecord, TransactionResponse, Wallet};
use async_trait::async_trait;

/// 钱包/交易缓存存储
///
/// 交易以 (hash, chain_id) 为唯一键，upsert 必须是原子的：重复写入只更新不新增。
/// 地址、哈希一律以小写传入。
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn find_wallet_by_address(&self, address: &str) -> Result<Option<Wallet>, AppError>;

    /// 不存在则创建，存在则刷新 updated_at
    async fn upsert_wallet(&self, address: &str) -> Result<Wallet, AppError>;

    /// 不存在则创建，存在则原样返回（不刷新时间）
    async fn ensure_wallet(&self, address: &str) -> Result<Wallet, AppError> {
        match self.find_wallet_by_address(address).await? {
            Some(wallet) => Ok(wallet),
            None => self.upsert_wallet(address).await,
        }
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError>;

    /// 钱包在某条链上作为发送方或接收方的交易，按时间倒序
    async fn find_transactions_by_wallet(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Vec<TransactionResponse>, AppError>;

    /// 按 (hash, chain_id) upsert；更新时 None 字段保留原值
    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), AppError>;

    async fn find_transaction_by_hash(
        &self,
        hash: &str,
        chain_id: u64,
    ) -> Result<Option<TransactionResponse>, AppError>;
}

/// 代币元数据缓存，键为 (chain_id, 合约地址)
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self, chain_id: u64, contract: &str) -> Result<Option<TokenMetadata>, AppError>;

    async fn put(
        &self,
        chain_id: u64,
        contract: &str,
        metadata: &TokenMetadata,
    ) -> Result<(), AppError>;
}
