use crate::config::{NetworkRegistry, ScanConfig};
use crate::errors::error::AppError;
use crate::infrastructure::indexer::IndexerClient;
use crate::infrastructure::provider::Connector;
use crate::models::{
    BalanceResponse, PageRequest, SyncResponse, TransactionResponse, TransactionsPage, TxFilter,
};
use crate::repositories::{CacheStore, TokenCache};
use crate::services::enrichment_service::EnrichmentService;
use crate::services::error_sink::{ErrorSink, FailureStage};
use crate::services::fetch_service::{
    BlockScanFetcher, FetchService, IndexerFetcher, TransactionFetcher,
};
use crate::services::pagination::paginate;
use crate::services::reconcile_service::ReconcileService;
use crate::services::sync_registry::{SyncRegistry, SyncStatus};
use crate::services::sync_service::SyncService;
use crate::utils::format::format_native;
use crate::utils::{parse_address, parse_tx_hash, timestamp_to_i64, validate_address};
use crate::{log_debug, log_info, log_warn};
use chrono::Utc;
use std::sync::Arc;

/// WalletService 的外部依赖
pub struct WalletServiceDeps {
    pub connector: Arc<dyn Connector>,
    pub networks: Arc<NetworkRegistry>,
    pub store: Arc<dyn CacheStore>,
    pub token_cache: Arc<dyn TokenCache>,
    pub indexer: Arc<IndexerClient>,
    pub scan: ScanConfig,
    pub sync_limit: usize,
    pub error_sink: Arc<dyn ErrorSink>,
}

/// 对外暴露的钱包查询入口
pub struct WalletService {
    connector: Arc<dyn Connector>,
    store: Arc<dyn CacheStore>,
    enrichment: Arc<EnrichmentService>,
    reconcile: Arc<ReconcileService>,
    sync: SyncService,
    error_sink: Arc<dyn ErrorSink>,
}

impl WalletService {
    pub fn new(deps: WalletServiceDeps) -> Self {
        let enrichment = Arc::new(EnrichmentService::new(
            deps.connector.clone(),
            deps.token_cache,
            deps.error_sink.clone(),
            deps.scan.receipt_timeout(),
        ));
        let reconcile = Arc::new(ReconcileService::new(
            deps.store.clone(),
            deps.error_sink.clone(),
        ));
        // 索引器优先，区块扫描兜底
        let fetchers: Vec<Arc<dyn TransactionFetcher>> = vec![
            Arc::new(IndexerFetcher::new(deps.indexer, deps.networks)),
            Arc::new(BlockScanFetcher::new(deps.connector.clone(), deps.scan)),
        ];
        let sync = SyncService::new(
            Arc::new(FetchService::new(fetchers)),
            enrichment.clone(),
            reconcile.clone(),
            Arc::new(SyncRegistry::new()),
            deps.error_sink.clone(),
            deps.sync_limit,
        );
        Self {
            connector: deps.connector,
            store: deps.store,
            enrichment,
            reconcile,
            sync,
            error_sink: deps.error_sink,
        }
    }

    /// 原生币余额（ETH 单位），顺带刷新钱包记录
    pub async fn get_balance(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<BalanceResponse, AppError> {
        let address = validate_address(address)?;
        let wallet = parse_address(&address)?;

        let provider = self.connector.provider(chain_id).await?;
        let wei = provider.get_balance(wallet).await?;

        if let Err(e) = self.store.upsert_wallet(&address).await {
            self.error_sink
                .report(FailureStage::WalletWrite, &address, &e);
        }
        Ok(BalanceResponse {
            balance: format_native(wei),
        })
    }

    /// 缓存中的交易分页
    ///
    /// 缓存为空时触发后台同步并立即返回空页；本页尚未检查过收据的交易会并发补全后回写。
    pub async fn get_transactions(
        &self,
        address: &str,
        filter: Option<TxFilter>,
        limit: usize,
        page: usize,
        chain_id: u64,
    ) -> Result<TransactionsPage, AppError> {
        let address = validate_address(address)?;
        let request = PageRequest::new(page, limit);

        if let Err(e) = self.store.ensure_wallet(&address).await {
            self.error_sink
                .report(FailureStage::WalletWrite, &address, &e);
        }
        let cached = match self
            .store
            .find_transactions_by_wallet(&address, chain_id)
            .await
        {
            Ok(txs) => txs,
            Err(e) => {
                self.error_sink.report(FailureStage::CacheRead, &address, &e);
                Vec::new()
            }
        };

        if cached.is_empty() {
            if self.sync.spawn_background(&address, chain_id).await {
                log_info!("{} chain={} 缓存为空，已触发后台同步", address, chain_id);
            }
            return Ok(TransactionsPage::empty(request));
        }

        let mut page = paginate(cached, &address, filter, request);
        page.items = self.enrich_page(page.items, &address, chain_id).await;
        Ok(TransactionsPage::from_page(page, request))
    }

    async fn enrich_page(
        &self,
        items: Vec<TransactionResponse>,
        address: &str,
        chain_id: u64,
    ) -> Vec<TransactionResponse> {
        let pending: Vec<bool> = items.iter().map(TransactionResponse::needs_enrichment).collect();
        if !pending.contains(&true) {
            return items;
        }
        let items = self.enrichment.enrich_all(items, chain_id).await;
        // 拿到收据的行回写，之后的读取不再请求收据
        let checked: Vec<TransactionResponse> = items
            .iter()
            .zip(pending)
            .filter(|(tx, was_pending)| *was_pending && !tx.needs_enrichment())
            .map(|(tx, _)| tx.clone())
            .collect();
        if !checked.is_empty() {
            self.reconcile
                .reconcile(Some(address), chain_id, &checked)
                .await;
        }
        items
    }

    /// 单笔交易：先查缓存，未命中从链上读取、补全；已确认的写回缓存（不关联钱包）
    pub async fn get_transaction_by_hash(
        &self,
        hash: &str,
        chain_id: u64,
    ) -> Result<TransactionResponse, AppError> {
        let tx_hash = parse_tx_hash(hash)?;
        let hash = format!("{:#x}", tx_hash);

        match self.store.find_transaction_by_hash(&hash, chain_id).await {
            Ok(Some(tx)) => return Ok(tx),
            Ok(None) => {}
            Err(e) => self.error_sink.report(FailureStage::CacheRead, &hash, &e),
        }

        let provider = self.connector.provider(chain_id).await?;
        let tx = provider
            .get_transaction(tx_hash)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("交易 {} (chain {})", hash, chain_id)))?;

        let receipt = match provider.get_transaction_receipt(tx_hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.error_sink.report(FailureStage::Receipt, &hash, &e);
                None
            }
        };
        // 未打包的交易没有区块时间，取当前时间
        let timestamp = match tx.block_number {
            Some(number) => match provider.get_block(number.as_u64()).await {
                Ok(Some(block)) => timestamp_to_i64(block.timestamp),
                Ok(None) => Utc::now().timestamp(),
                Err(e) => {
                    log_warn!("区块 #{} 读取失败，时间戳取当前时间: {}", number, e);
                    Utc::now().timestamp()
                }
            },
            None => Utc::now().timestamp(),
        };

        let mut response = TransactionResponse::from_ethers(&tx, receipt.as_ref(), timestamp);
        if let Some(receipt) = receipt.as_ref() {
            response = self
                .enrichment
                .apply_receipt(response, receipt, provider.as_ref(), chain_id)
                .await;
        }
        // 未打包或没有收据的交易状态未定，只返回不缓存
        if response.block_number.is_some() && receipt.is_some() {
            self.reconcile
                .reconcile(None, chain_id, std::slice::from_ref(&response))
                .await;
        } else {
            log_debug!("交易 {} 尚未确认，不写入缓存", hash);
        }
        Ok(response)
    }

    /// 前台同步，返回写入缓存的行数
    pub async fn sync_transactions(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<SyncResponse, AppError> {
        let address = validate_address(address)?;
        let synced = match self.sync.sync(&address, chain_id).await {
            Ok(synced) => synced,
            Err(e) => {
                self.error_sink.report(FailureStage::Sync, &address, &e);
                0
            }
        };
        Ok(SyncResponse { synced })
    }

    pub async fn sync_status(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Option<SyncStatus>, AppError> {
        let address = validate_address(address)?;
        Ok(self.sync.status(&address, chain_id).await)
    }

    /// 定时刷新：所有已缓存钱包在指定链上重新同步
    pub async fn refresh_all(&self, chain_ids: &[u64]) -> Result<usize, AppError> {
        let wallets = self.store.list_wallets().await?;
        let mut total = 0;
        for wallet in &wallets {
            for &chain_id in chain_ids {
                total += self.sync_transactions(&wallet.address, chain_id).await?.synced;
            }
        }
        log_info!(
            "定时刷新完成: {} 个钱包 × {} 条链，写入 {} 笔",
            wallets.len(),
            chain_ids.len(),
            total
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use crate::config::network_config::SEPOLIA_CHAIN_ID;
    use crate::infrastructure::provider::mock::{
        MockConnector, MockProvider, block, mined_tx, plain_receipt, transfer_receipt,
    };
    use crate::repositories::{MemoryCacheStore, MemoryTokenCache};
    use crate::models::{TransactionRecord, Wallet};
    use crate::services::error_sink::testing::RecordingSink;
    use async_trait::async_trait;
    use ethers_core::types::{Address, H256, Transaction, U256};
    use std::time::Duration;

    struct Harness {
        service: WalletService,
        connector: Arc<MockConnector>,
        store: Arc<MemoryCacheStore>,
        sink: Arc<RecordingSink>,
    }

    fn wallet() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn wallet_str() -> String {
        format!("{:#x}", wallet())
    }

    fn token() -> Address {
        Address::repeat_byte(0x77)
    }

    /// #9: 他人转入 1 ETH；#10: 钱包发出 1.5 USDC
    fn chain() -> MockProvider {
        let other = Address::repeat_byte(0x55);
        let incoming = mined_tx(H256::repeat_byte(0x09), other, Some(wallet()), U256::exp10(18), 9);
        let token_send = mined_tx(H256::repeat_byte(0x10), wallet(), Some(token()), U256::zero(), 10);
        let mut provider = MockProvider::default()
            .with_block(block(9, 1_000, vec![incoming]))
            .with_block(block(10, 1_012, vec![token_send]))
            .with_receipt(plain_receipt(H256::repeat_byte(0x09)))
            .with_receipt(transfer_receipt(
                H256::repeat_byte(0x10),
                token(),
                wallet(),
                other,
                U256::from(1_500_000u64),
            ))
            .with_token(token(), "USD Coin", "USDC", 6);
        provider
            .balances
            .insert(wallet(), U256::from(1_500_000_000_000_000_000u64));
        provider
    }

    fn deps(
        connector: Arc<MockConnector>,
        store: Arc<dyn CacheStore>,
        sink: Arc<RecordingSink>,
    ) -> WalletServiceDeps {
        let indexer = IndexerClient::new(&IndexerConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            api_key: None,
            timeout_secs: 1,
        })
        .unwrap();
        WalletServiceDeps {
            connector,
            networks: Arc::new(NetworkRegistry::default()),
            store,
            token_cache: Arc::new(MemoryTokenCache::new()),
            indexer: Arc::new(indexer),
            scan: ScanConfig {
                max_blocks: 20,
                budget_secs: 5,
                block_number_timeout_secs: 1,
                block_timeout_ms: 200,
                receipt_timeout_ms: 200,
            },
            sync_limit: 50,
            error_sink: sink,
        }
    }

    fn harness(provider: MockProvider) -> Harness {
        let connector = Arc::new(MockConnector::new(provider));
        let store = Arc::new(MemoryCacheStore::new());
        let sink = Arc::new(RecordingSink::default());
        let service = WalletService::new(deps(connector.clone(), store.clone(), sink.clone()));
        Harness {
            service,
            connector,
            store,
            sink,
        }
    }

    async fn wait_for_sync(service: &WalletService, address: &str) -> SyncStatus {
        for _ in 0..200 {
            match service.sync_status(address, SEPOLIA_CHAIN_ID).await.unwrap() {
                Some(status) if !status.is_active() => return status,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
        panic!("background sync did not finish");
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_network_call() {
        let h = harness(chain());
        assert!(h.service.get_balance("0x123", 1).await.unwrap_err().is_validation());
        assert!(
            h.service
                .get_transactions("not-an-address", None, 10, 1, 1)
                .await
                .unwrap_err()
                .is_validation()
        );
        assert!(
            h.service
                .get_transaction_by_hash("0xzz", 1)
                .await
                .unwrap_err()
                .is_validation()
        );
        assert!(h.service.sync_transactions("", 1).await.unwrap_err().is_validation());
        assert_eq!(h.connector.network_calls(), 0);
        assert!(h.store.list_wallets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn balance_is_formatted_and_wallet_recorded() {
        let h = harness(chain());
        let upper = wallet_str().to_uppercase().replacen("0X", "0x", 1);
        let balance = h.service.get_balance(&upper, SEPOLIA_CHAIN_ID).await.unwrap();
        assert_eq!(balance.balance, "1.5");
        assert!(h.store.find_wallet_by_address(&wallet_str()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_hash_is_not_found() {
        let h = harness(chain());
        let err = h
            .service
            .get_transaction_by_hash(&format!("{:#x}", H256::repeat_byte(0xee)), SEPOLIA_CHAIN_ID)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn hash_lookup_reads_chain_once_then_serves_cache() {
        let h = harness(chain());
        let hash = format!("{:#x}", H256::repeat_byte(0x10));

        let tx = h
            .service
            .get_transaction_by_hash(&hash.to_uppercase().replacen("0X", "0x", 1), SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert_eq!(tx.hash, hash);
        assert_eq!(tx.timestamp, 1_012);
        assert_eq!(tx.gas_used, Some(52_000));
        assert_eq!(tx.token_transfer.as_ref().unwrap().amount, "1.5");
        // 不关联钱包
        assert_eq!(h.store.wallet_link(&hash, SEPOLIA_CHAIN_ID).await, None);

        let calls = h.connector.network_calls();
        let cached = h
            .service
            .get_transaction_by_hash(&hash, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert_eq!(cached, tx);
        assert_eq!(h.connector.network_calls(), calls);
    }

    #[tokio::test]
    async fn empty_cache_triggers_background_sync_then_serves_enriched_rows() {
        let h = harness(chain());
        let address = wallet_str();

        let first = h
            .service
            .get_transactions(&address, None, 10, 1, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert!(first.transactions.is_empty());
        assert_eq!(first.total, 0);
        assert!(!first.has_more);

        assert_eq!(
            wait_for_sync(&h.service, &address).await,
            SyncStatus::Done { synced: 2 }
        );

        let second = h
            .service
            .get_transactions(&address, None, 10, 1, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert_eq!(second.total, 2);
        assert_eq!(second.total_pages, 1);
        let newest = &second.transactions[0];
        assert_eq!(newest.hash, format!("{:#x}", H256::repeat_byte(0x10)));
        let transfer = newest.token_transfer.as_ref().unwrap();
        assert_eq!(transfer.symbol.as_deref(), Some("USDC"));
        assert_eq!(transfer.amount, "1.5");
        assert!(second.transactions[1].token_transfer.is_none());
        assert_eq!(second.transactions[1].amount, "1");

        let received = h
            .service
            .get_transactions(&address, Some(TxFilter::Received), 10, 1, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert_eq!(received.total, 1);
        assert_eq!(received.transactions[0].to_address, address);
    }

    #[tokio::test]
    async fn foreground_sync_is_idempotent() {
        let h = harness(chain());
        let address = wallet_str();

        let first = h.service.sync_transactions(&address, SEPOLIA_CHAIN_ID).await.unwrap();
        let second = h.service.sync_transactions(&address, SEPOLIA_CHAIN_ID).await.unwrap();
        assert_eq!(first.synced, 2);
        assert_eq!(second.synced, 2);
        assert_eq!(h.store.transaction_count().await, 2);
        assert_eq!(
            h.service.sync_status(&address, SEPOLIA_CHAIN_ID).await.unwrap(),
            Some(SyncStatus::Done { synced: 2 })
        );

        let wallet = h.store.find_wallet_by_address(&address).await.unwrap().unwrap();
        let hash = format!("{:#x}", H256::repeat_byte(0x09));
        assert_eq!(h.store.wallet_link(&hash, SEPOLIA_CHAIN_ID).await, Some(wallet.id));
    }

    #[tokio::test]
    async fn refresh_resyncs_known_wallets() {
        let h = harness(chain());
        h.store.upsert_wallet(&wallet_str()).await.unwrap();
        let written = h.service.refresh_all(&[SEPOLIA_CHAIN_ID]).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(h.service.refresh_all(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn synced_page_reads_make_no_network_calls() {
        let h = harness(chain());
        let address = wallet_str();
        h.service.sync_transactions(&address, SEPOLIA_CHAIN_ID).await.unwrap();

        let calls = h.connector.network_calls();
        for _ in 0..3 {
            let page = h
                .service
                .get_transactions(&address, None, 10, 1, SEPOLIA_CHAIN_ID)
                .await
                .unwrap();
            assert_eq!(page.total, 2);
            // #9 没有代币转账，也不应再请求收据
            assert!(page.transactions[1].token_transfer.is_none());
        }
        assert_eq!(h.connector.network_calls(), calls);
    }

    #[tokio::test]
    async fn unchecked_cached_rows_are_enriched_once() {
        let h = harness(chain());
        let address = wallet_str();
        // 索引器写入的行：没有收据信息
        let plain = TransactionResponse::from_ethers(
            &mined_tx(H256::repeat_byte(0x09), Address::repeat_byte(0x55), Some(wallet()), U256::exp10(18), 9),
            None,
            1_000,
        );
        h.service
            .reconcile
            .reconcile(Some(&address), SEPOLIA_CHAIN_ID, &[plain])
            .await;

        h.service
            .get_transactions(&address, None, 10, 1, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        let calls = h.connector.network_calls();
        assert!(calls > 0);

        h.service
            .get_transactions(&address, None, 10, 1, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert_eq!(h.connector.network_calls(), calls);
    }

    #[tokio::test]
    async fn pending_transaction_is_returned_but_not_cached() {
        let hash = H256::repeat_byte(0x42);
        let mut provider = chain();
        provider.pending.insert(
            hash,
            Transaction {
                block_number: None,
                ..mined_tx(hash, wallet(), Some(Address::repeat_byte(0x55)), U256::exp10(18), 0)
            },
        );
        let h = harness(provider);
        let hash = format!("{:#x}", hash);

        let tx = h
            .service
            .get_transaction_by_hash(&hash, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert_eq!(tx.block_number, None);
        assert_eq!(tx.amount, "1");
        assert_eq!(h.store.transaction_count().await, 0);
        assert_eq!(h.sink.count(FailureStage::CacheWrite), 0);

        // 再查一次仍然走链上
        let calls = h.connector.network_calls();
        h.service
            .get_transaction_by_hash(&hash, SEPOLIA_CHAIN_ID)
            .await
            .unwrap();
        assert!(h.connector.network_calls() > calls);
    }

    /// 交易写入一律失败
    #[derive(Default)]
    struct RejectingStore {
        inner: MemoryCacheStore,
    }

    #[async_trait]
    impl CacheStore for RejectingStore {
        async fn find_wallet_by_address(&self, address: &str) -> Result<Option<Wallet>, AppError> {
            self.inner.find_wallet_by_address(address).await
        }

        async fn upsert_wallet(&self, address: &str) -> Result<Wallet, AppError> {
            self.inner.upsert_wallet(address).await
        }

        async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
            self.inner.list_wallets().await
        }

        async fn find_transactions_by_wallet(
            &self,
            address: &str,
            chain_id: u64,
        ) -> Result<Vec<TransactionResponse>, AppError> {
            self.inner.find_transactions_by_wallet(address, chain_id).await
        }

        async fn upsert_transaction(&self, _record: &TransactionRecord) -> Result<(), AppError> {
            Err(AppError::ConnectionPool("pool exhausted".to_string()))
        }

        async fn find_transaction_by_hash(
            &self,
            hash: &str,
            chain_id: u64,
        ) -> Result<Option<TransactionResponse>, AppError> {
            self.inner.find_transaction_by_hash(hash, chain_id).await
        }
    }

    #[tokio::test]
    async fn failed_foreground_sync_is_reported_as_sync() {
        let connector = Arc::new(MockConnector::new(chain()));
        let sink = Arc::new(RecordingSink::default());
        let service = WalletService::new(deps(
            connector,
            Arc::new(RejectingStore::default()),
            sink.clone(),
        ));
        let address = wallet_str();

        let result = service.sync_transactions(&address, SEPOLIA_CHAIN_ID).await.unwrap();
        assert_eq!(result.synced, 0);
        assert_eq!(sink.count(FailureStage::Sync), 1);
        assert_eq!(sink.count(FailureStage::CacheWrite), 2);
        assert!(matches!(
            service.sync_status(&address, SEPOLIA_CHAIN_ID).await.unwrap(),
            Some(SyncStatus::Failed { .. })
        ));
    }
}
