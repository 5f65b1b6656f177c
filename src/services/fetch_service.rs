use crate::config::{NetworkRegistry, ScanConfig};
use crate::infrastructure::indexer::IndexerClient;
use crate::infrastructure::provider::{Connector, ProviderTrait};
use crate::models::TransactionResponse;
use crate::utils::{parse_address, timestamp_to_i64};
use crate::{log_debug, log_info, log_warn};
use async_trait::async_trait;
use ethers_core::types::{Address, Transaction};
use std::sync::Arc;
use tokio::time::{Instant, timeout};

/// 一种交易来源
///
/// 实现方自行吞掉上游错误，拿不到数据时返回空列表。
#[async_trait]
pub trait TransactionFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, address: &str, chain_id: u64, limit: usize) -> Vec<TransactionResponse>;
}

/// 主路径：Etherscan 风格索引器
pub struct IndexerFetcher {
    client: Arc<IndexerClient>,
    networks: Arc<NetworkRegistry>,
}

impl IndexerFetcher {
    pub fn new(client: Arc<IndexerClient>, networks: Arc<NetworkRegistry>) -> Self {
        Self { client, networks }
    }
}

#[async_trait]
impl TransactionFetcher for IndexerFetcher {
    fn name(&self) -> &'static str {
        "indexer"
    }

    async fn fetch(&self, address: &str, chain_id: u64, limit: usize) -> Vec<TransactionResponse> {
        let indexer_chain_id = self.networks.get(chain_id).indexer_chain_id();
        self.client
            .fetch_transactions(address, indexer_chain_id, limit)
            .await
    }
}

/// 兜底：从链头向前逐块扫描
pub struct BlockScanFetcher {
    connector: Arc<dyn Connector>,
    scan: ScanConfig,
}

impl BlockScanFetcher {
    pub fn new(connector: Arc<dyn Connector>, scan: ScanConfig) -> Self {
        Self { connector, scan }
    }

    async fn head_block(&self, provider: &dyn ProviderTrait) -> Option<u64> {
        match timeout(self.scan.block_number_timeout(), provider.get_last_block_number()).await {
            Ok(Ok(number)) => Some(number.as_u64()),
            Ok(Err(e)) => {
                log_warn!("获取最新区块号失败: {}", e);
                None
            }
            Err(_) => {
                log_warn!("获取最新区块号超时");
                None
            }
        }
    }

    async fn to_response(
        &self,
        provider: &dyn ProviderTrait,
        tx: &Transaction,
        block_number: u64,
        timestamp: i64,
        deadline: Instant,
    ) -> TransactionResponse {
        // 收据拿不到时保留交易，状态按成功、gas 未知
        let wait = self
            .scan
            .receipt_timeout()
            .min(deadline.saturating_duration_since(Instant::now()));
        let receipt =
            match timeout(wait, provider.get_transaction_receipt(tx.hash)).await {
                Ok(Ok(receipt)) => receipt,
                Ok(Err(e)) => {
                    log_debug!("收据获取失败 {:?}: {}", tx.hash, e);
                    None
                }
                Err(_) => {
                    log_debug!("收据获取超时 {:?}", tx.hash);
                    None
                }
            };
        let mut response = TransactionResponse::from_ethers(tx, receipt.as_ref(), timestamp);
        if response.block_number.is_none() {
            response.block_number = i64::try_from(block_number).ok();
        }
        response
    }
}

fn involves(tx: &Transaction, wallet: Address) -> bool {
    tx.from == wallet || tx.to == Some(wallet)
}

#[async_trait]
impl TransactionFetcher for BlockScanFetcher {
    fn name(&self) -> &'static str {
        "block_scan"
    }

    async fn fetch(&self, address: &str, chain_id: u64, limit: usize) -> Vec<TransactionResponse> {
        if limit == 0 || self.scan.max_blocks == 0 {
            return Vec::new();
        }
        let Ok(wallet) = parse_address(address) else {
            return Vec::new();
        };
        let provider = match self.connector.provider(chain_id).await {
            Ok(p) => p,
            Err(e) => {
                log_warn!("chain {} provider 不可用，跳过区块扫描: {}", chain_id, e);
                return Vec::new();
            }
        };
        let Some(head) = self.head_block(provider.as_ref()).await else {
            return Vec::new();
        };

        let deadline = Instant::now() + self.scan.budget();
        let lowest = head.saturating_sub(self.scan.max_blocks - 1);
        let mut found = Vec::new();
        let mut scanned = 0u64;

        'blocks: for number in (lowest..=head).rev() {
            if Instant::now() >= deadline {
                log_debug!("区块扫描预算耗尽，停在 #{}", number);
                break;
            }
            scanned += 1;
            let block =
                match timeout(self.scan.block_timeout(), provider.get_block_with_txs(number)).await
                {
                    Ok(Ok(Some(block))) => block,
                    Ok(Ok(None)) => continue,
                    Ok(Err(e)) => {
                        log_debug!("区块 #{} 获取失败，跳过: {}", number, e);
                        continue;
                    }
                    Err(_) => {
                        log_debug!("区块 #{} 获取超时，跳过", number);
                        continue;
                    }
                };
            let timestamp = timestamp_to_i64(block.timestamp);

            for tx in block.transactions.iter().filter(|tx| involves(tx, wallet)) {
                if Instant::now() >= deadline {
                    log_debug!("区块扫描预算耗尽，停在 #{} 的交易 {:?}", number, tx.hash);
                    break 'blocks;
                }
                found.push(
                    self.to_response(provider.as_ref(), tx, number, timestamp, deadline)
                        .await,
                );
                if found.len() >= limit {
                    break 'blocks;
                }
            }
        }

        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        log_info!(
            "区块扫描完成 address={} chain={} 扫描 {} 块，命中 {} 笔",
            address,
            chain_id,
            scanned,
            found.len()
        );
        found
    }
}

/// 按顺序尝试各来源，第一个非空结果胜出
pub struct FetchService {
    fetchers: Vec<Arc<dyn TransactionFetcher>>,
}

impl FetchService {
    pub fn new(fetchers: Vec<Arc<dyn TransactionFetcher>>) -> Self {
        Self { fetchers }
    }

    pub async fn fetch(&self, address: &str, chain_id: u64, limit: usize) -> Vec<TransactionResponse> {
        for fetcher in &self.fetchers {
            let mut txs = fetcher.fetch(address, chain_id, limit).await;
            if txs.is_empty() {
                log_debug!("{} 未返回交易 address={} chain={}", fetcher.name(), address, chain_id);
                continue;
            }
            txs.truncate(limit);
            log_info!(
                "{} 返回 {} 笔交易 address={} chain={}",
                fetcher.name(),
                txs.len(),
                address,
                chain_id
            );
            return txs;
        }
        Vec::new()
    }
}
