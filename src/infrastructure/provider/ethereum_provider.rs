use crate::errors::error::AppError;
use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Block, Bytes, H256, Transaction, TransactionReceipt, U64, U256};
use ethers_providers::{Http, Middleware, Provider};
use url::Url;

/// 单条链的只读 JSON-RPC 能力
///
/// 本层不做重试，错误原样上抛，由调用方决定跳过还是失败。
#[async_trait]
pub trait ProviderTrait: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256, AppError>;
    async fn get_last_block_number(&self) -> Result<U64, AppError>;
    /// 仅区块头（交易只含哈希）
    async fn get_block(&self, number: u64) -> Result<Option<Block<H256>>, AppError>;
    async fn get_block_with_txs(&self, number: u64)
    -> Result<Option<Block<Transaction>>, AppError>;
    async fn get_transaction(&self, tx_hash: H256) -> Result<Option<Transaction>, AppError>;
    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, AppError>;
    /// eth_call，只读合约调用
    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, AppError>;
}

pub struct EthereumProvider {
    provider: Provider<Http>,
}

impl EthereumProvider {
    pub fn new(rpc_url: &str) -> Result<Self, AppError> {
        let url = Url::parse(rpc_url)
            .map_err(|e| AppError::Config(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let provider = Provider::<Http>::try_from(url.as_str())
            .map_err(|e| AppError::Config(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl ProviderTrait for EthereumProvider {
    async fn get_balance(&self, address: Address) -> Result<U256, AppError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(AppError::from)
    }

    async fn get_last_block_number(&self) -> Result<U64, AppError> {
        self.provider
            .get_block_number()
            .await
            .map_err(AppError::from)
    }

    async fn get_block(&self, number: u64) -> Result<Option<Block<H256>>, AppError> {
        self.provider.get_block(number).await.map_err(AppError::from)
    }

    async fn get_block_with_txs(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, AppError> {
        self.provider
            .get_block_with_txs(number)
            .await
            .map_err(AppError::from)
    }

    async fn get_transaction(&self, tx_hash: H256) -> Result<Option<Transaction>, AppError> {
        self.provider
            .get_transaction(tx_hash)
            .await
            .map_err(AppError::from)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, AppError> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(AppError::from)
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, AppError> {
        self.provider
            .call(tx, None)
            .await
            .map_err(|e| AppError::ProviderError(format!("eth_call failed: {}", e)))
    }
}
