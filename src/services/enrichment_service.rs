use crate::errors::error::AppError;
use crate::infrastructure::parser::detect_transfer;
use crate::infrastructure::provider::{Connector, ProviderTrait};
use crate::log_debug;
use crate::models::{TokenMetadata, TokenTransfer, TransactionResponse};
use crate::repositories::TokenCache;
use crate::services::error_sink::{ErrorSink, FailureStage};
use crate::services::token_service::resolve_token_metadata;
use crate::utils::{address_to_string, parse_tx_hash};
use ethers_core::types::{Address, TransactionReceipt};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// 为交易补全 ERC-20 转账信息
///
/// 所有失败都降级为"原样返回"，并上报到 ErrorSink。
pub struct EnrichmentService {
    connector: Arc<dyn Connector>,
    token_cache: Arc<dyn TokenCache>,
    error_sink: Arc<dyn ErrorSink>,
    receipt_timeout: Duration,
}

impl EnrichmentService {
    pub fn new(
        connector: Arc<dyn Connector>,
        token_cache: Arc<dyn TokenCache>,
        error_sink: Arc<dyn ErrorSink>,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            token_cache,
            error_sink,
            receipt_timeout,
        }
    }

    /// 并发补全一批交易，顺序不变
    pub async fn enrich_all(
        &self,
        txs: Vec<TransactionResponse>,
        chain_id: u64,
    ) -> Vec<TransactionResponse> {
        join_all(txs.into_iter().map(|tx| self.enrich(tx, chain_id))).await
    }

    pub async fn enrich(&self, tx: TransactionResponse, chain_id: u64) -> TransactionResponse {
        if !tx.needs_enrichment() {
            return tx;
        }
        let Ok(hash) = parse_tx_hash(&tx.hash) else {
            return tx;
        };
        let provider = match self.connector.provider(chain_id).await {
            Ok(p) => p,
            Err(e) => {
                self.error_sink.report(FailureStage::Receipt, &tx.hash, &e);
                return tx;
            }
        };
        let receipt =
            match timeout(self.receipt_timeout, provider.get_transaction_receipt(hash)).await {
                Ok(Ok(Some(receipt))) => receipt,
                Ok(Ok(None)) => {
                    log_debug!("交易 {} 暂无收据，跳过补全", tx.hash);
                    return tx;
                }
                Ok(Err(e)) => {
                    self.error_sink.report(FailureStage::Receipt, &tx.hash, &e);
                    return tx;
                }
                Err(_) => {
                    let e = AppError::Timeout(format!("receipt {}", tx.hash));
                    self.error_sink.report(FailureStage::Receipt, &tx.hash, &e);
                    return tx;
                }
            };
        self.apply_receipt(tx, &receipt, provider.as_ref(), chain_id)
            .await
    }

    /// 用已拿到的收据补全，不再重复请求收据
    pub async fn apply_receipt(
        &self,
        mut tx: TransactionResponse,
        receipt: &TransactionReceipt,
        provider: &dyn ProviderTrait,
        chain_id: u64,
    ) -> TransactionResponse {
        tx.receipt_checked = true;
        let Some(detected) = detect_transfer(receipt) else {
            return tx;
        };
        let metadata = self
            .token_metadata(provider, chain_id, detected.contract_address)
            .await;
        let decimals = metadata.decimals_or_default();
        tx.token_transfer = Some(TokenTransfer::from_detected(
            &detected,
            metadata.name,
            metadata.symbol,
            decimals,
        ));
        tx
    }

    /// 先查缓存，未命中再走链上并回写缓存
    async fn token_metadata(
        &self,
        provider: &dyn ProviderTrait,
        chain_id: u64,
        contract: Address,
    ) -> TokenMetadata {
        let key = address_to_string(contract);
        match self.token_cache.get(chain_id, &key).await {
            Ok(Some(cached)) => return cached,
            Ok(None) => {}
            Err(e) => self.error_sink.report(FailureStage::TokenCache, &key, &e),
        }

        let metadata = resolve_token_metadata(provider, contract).await;
        if metadata.is_empty() {
            let e = AppError::ProviderError(format!("token {} 元数据不可读", key));
            self.error_sink.report(FailureStage::TokenMetadata, &key, &e);
            return metadata;
        }
        if let Err(e) = self.token_cache.put(chain_id, &key, &metadata).await {
            self.error_sink.report(FailureStage::TokenCache, &key, &e);
        }
        metadata
    }
}
