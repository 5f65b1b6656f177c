use crate::log_debug;
use crate::models::{TransactionRecord, TransactionResponse};
use crate::repositories::CacheStore;
use crate::services::error_sink::{ErrorSink, FailureStage};
use std::sync::Arc;

/// 把补全后的交易写回缓存
pub struct ReconcileService {
    store: Arc<dyn CacheStore>,
    error_sink: Arc<dyn ErrorSink>,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn CacheStore>, error_sink: Arc<dyn ErrorSink>) -> Self {
        Self { store, error_sink }
    }

    /// 按 (hash, chain_id) upsert，返回成功写入的行数
    ///
    /// 传入钱包地址时先确保钱包存在，新行关联到该钱包；单行失败上报后跳过。
    pub async fn reconcile(
        &self,
        wallet: Option<&str>,
        chain_id: u64,
        txs: &[TransactionResponse],
    ) -> usize {
        if txs.is_empty() {
            return 0;
        }
        let wallet_id = match wallet {
            Some(address) => match self.store.ensure_wallet(address).await {
                Ok(w) => Some(w.id),
                Err(e) => {
                    self.error_sink.report(FailureStage::WalletWrite, address, &e);
                    None
                }
            },
            None => None,
        };

        let mut written = 0;
        for tx in txs {
            let record = TransactionRecord {
                chain_id,
                wallet_id,
                tx: tx.clone(),
            };
            match self.store.upsert_transaction(&record).await {
                Ok(()) => written += 1,
                Err(e) => self.error_sink.report(FailureStage::CacheWrite, &tx.hash, &e),
            }
        }
        log_debug!("chain {} 写入缓存 {}/{} 笔", chain_id, written, txs.len());
        written
    }
}
