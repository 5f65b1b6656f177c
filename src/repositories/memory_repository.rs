use crate::errors::error::AppError;
use crate::models::{TokenTransfer, TransactionRecord, TransactionResponse, Wallet};
use crate::repositories::traits::repository::CacheStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredTransaction {
    wallet_id: Option<i64>,
    tx: TransactionResponse,
}

#[derive(Default)]
struct MemoryState {
    wallets: HashMap<String, Wallet>,
    next_wallet_id: i64,
    transactions: HashMap<(String, u64), StoredTransaction>,
}

/// 进程内缓存存储，语义与 PgCacheStore 保持一致
///
/// 用于 `cache.backend = "memory"` 和测试。
#[derive(Default)]
pub struct MemoryCacheStore {
    state: RwLock<MemoryState>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    pub async fn wallet_link(&self, hash: &str, chain_id: u64) -> Option<i64> {
        self.state
            .read()
            .await
            .transactions
            .get(&(hash.to_string(), chain_id))
            .and_then(|s| s.wallet_id)
    }
}

/// 与 SQL changeset 相同：新值为 None 的可选字段保留旧值
fn merge(existing: &StoredTransaction, incoming: &TransactionRecord) -> StoredTransaction {
    let new = &incoming.tx;
    let old = &existing.tx;
    let token_transfer: Option<TokenTransfer> = match (&new.token_transfer, &old.token_transfer) {
        (Some(n), Some(o)) => Some(TokenTransfer {
            name: n.name.clone().or_else(|| o.name.clone()),
            symbol: n.symbol.clone().or_else(|| o.symbol.clone()),
            ..n.clone()
        }),
        (Some(n), None) => Some(n.clone()),
        (None, old_token) => old_token.clone(),
    };
    StoredTransaction {
        wallet_id: incoming.wallet_id.or(existing.wallet_id),
        tx: TransactionResponse {
            hash: old.hash.clone(),
            from_address: new.from_address.clone(),
            to_address: new.to_address.clone(),
            amount: new.amount.clone(),
            block_number: new.block_number.or(old.block_number),
            gas_used: new.gas_used.or(old.gas_used),
            gas_price: new.gas_price.or(old.gas_price),
            timestamp: new.timestamp,
            status: new.status,
            token_transfer,
            receipt_checked: new.receipt_checked || old.receipt_checked,
        },
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn find_wallet_by_address(&self, address: &str) -> Result<Option<Wallet>, AppError> {
        Ok(self.state.read().await.wallets.get(address).cloned())
    }

    async fn upsert_wallet(&self, address: &str) -> Result<Wallet, AppError> {
        let now = Utc::now().naive_utc();
        let mut state = self.state.write().await;
        if let Some(wallet) = state.wallets.get_mut(address) {
            wallet.updated_at = now;
            return Ok(wallet.clone());
        }
        state.next_wallet_id += 1;
        let wallet = Wallet {
            id: state.next_wallet_id,
            address: address.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.wallets.insert(address.to_string(), wallet.clone());
        Ok(wallet)
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
        let state = self.state.read().await;
        let mut wallets: Vec<Wallet> = state.wallets.values().cloned().collect();
        wallets.sort_by_key(|w| w.id);
        Ok(wallets)
    }

    async fn find_transactions_by_wallet(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Vec<TransactionResponse>, AppError> {
        let state = self.state.read().await;
        let mut txs: Vec<TransactionResponse> = state
            .transactions
            .iter()
            .filter(|((_, chain), stored)| *chain == chain_id && stored.tx.involves(address))
            .map(|(_, stored)| stored.tx.clone())
            .collect();
        txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.hash.cmp(&a.hash)));
        Ok(txs)
    }

    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), AppError> {
        let incoming = TransactionRecord {
            chain_id: record.chain_id,
            wallet_id: record.wallet_id,
            tx: record.tx.clone().normalized(),
        };
        let key = (incoming.tx.hash.clone(), incoming.chain_id);
        let mut state = self.state.write().await;
        let stored = match state.transactions.get(&key) {
            Some(existing) => merge(existing, &incoming),
            None => StoredTransaction {
                wallet_id: incoming.wallet_id,
                tx: incoming.tx,
            },
        };
        state.transactions.insert(key, stored);
        Ok(())
    }

    async fn find_transaction_by_hash(
        &self,
        hash: &str,
        chain_id: u64,
    ) -> Result<Option<TransactionResponse>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .transactions
            .get(&(hash.to_string(), chain_id))
            .map(|s| s.tx.clone()))
    }
}
