//! 测试用的内存链：按预置数据应答 RPC，并统计请求次数

use crate::errors::error::AppError;
use crate::infrastructure::protocol::constants::ERC20_TRANSFER_TOPIC;
use crate::infrastructure::provider::connector::Connector;
use crate::infrastructure::provider::ethereum_provider::ProviderTrait;
use async_trait::async_trait;
use ethers_core::abi::{Token, encode};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{
    Address, Block, Bytes, H256, Log, Transaction, TransactionReceipt, U64, U256,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct MockProvider {
    pub head: u64,
    pub balances: HashMap<Address, U256>,
    pub blocks: HashMap<u64, Block<Transaction>>,
    pub receipts: HashMap<H256, TransactionReceipt>,
    /// (合约, 选择器) → 返回数据，未登记的调用返回错误
    pub calls: HashMap<(Address, [u8; 4]), Bytes>,
    /// 这些区块的请求永远不返回
    pub slow_blocks: HashSet<u64>,
    pub failing_receipts: HashSet<H256>,
    /// 这些收据的请求永远不返回
    pub slow_receipts: HashSet<H256>,
    /// 尚未打包的交易，只能按哈希查到
    pub pending: HashMap<H256, Transaction>,
    pub requests: AtomicUsize,
}

impl MockProvider {
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn with_block(mut self, block: Block<Transaction>) -> Self {
        let number = block.number.map(|n| n.as_u64()).unwrap_or_default();
        self.head = self.head.max(number);
        self.blocks.insert(number, block);
        self
    }

    pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
        self.receipts.insert(receipt.transaction_hash, receipt);
        self
    }

    /// 登记一个标准 ERC-20 合约的 name/symbol/decimals 返回值
    pub fn with_token(mut self, token: Address, name: &str, symbol: &str, decimals: u8) -> Self {
        use crate::infrastructure::protocol::constants::{
            ERC20_DECIMALS_SIGNATURE, ERC20_NAME_SIGNATURE, ERC20_SYMBOL_SIGNATURE, selector,
        };
        self.calls
            .insert((token, selector(ERC20_NAME_SIGNATURE)), abi_string(name));
        self.calls
            .insert((token, selector(ERC20_SYMBOL_SIGNATURE)), abi_string(symbol));
        self.calls.insert(
            (token, selector(ERC20_DECIMALS_SIGNATURE)),
            abi_uint(decimals as u64),
        );
        self
    }
}

#[async_trait]
impl ProviderTrait for MockProvider {
    async fn get_balance(&self, address: Address) -> Result<U256, AppError> {
        self.hit();
        Ok(self.balances.get(&address).copied().unwrap_or_default())
    }

    async fn get_last_block_number(&self) -> Result<U64, AppError> {
        self.hit();
        Ok(U64::from(self.head))
    }

    async fn get_block(&self, number: u64) -> Result<Option<Block<H256>>, AppError> {
        self.hit();
        Ok(self.blocks.get(&number).map(|b| Block::<H256> {
            hash: b.hash,
            number: b.number,
            timestamp: b.timestamp,
            transactions: b.transactions.iter().map(|t| t.hash).collect(),
            ..Default::default()
        }))
    }

    async fn get_block_with_txs(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, AppError> {
        self.hit();
        if self.slow_blocks.contains(&number) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self.blocks.get(&number).cloned())
    }

    async fn get_transaction(&self, tx_hash: H256) -> Result<Option<Transaction>, AppError> {
        self.hit();
        Ok(self
            .blocks
            .values()
            .flat_map(|b| b.transactions.iter())
            .find(|t| t.hash == tx_hash)
            .or_else(|| self.pending.get(&tx_hash))
            .cloned())
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, AppError> {
        self.hit();
        if self.slow_receipts.contains(&tx_hash) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_receipts.contains(&tx_hash) {
            return Err(AppError::ProviderError("receipt unavailable".to_string()));
        }
        Ok(self.receipts.get(&tx_hash).cloned())
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, AppError> {
        self.hit();
        let to = tx.to_addr().copied().unwrap_or_default();
        let data = tx.data().cloned().unwrap_or_default();
        let mut key = [0u8; 4];
        if data.len() >= 4 {
            key.copy_from_slice(&data[..4]);
        }
        self.calls
            .get(&(to, key))
            .cloned()
            .ok_or_else(|| AppError::ProviderError("execution reverted".to_string()))
    }
}

/// 所有 chain id 都返回同一个 MockProvider
pub struct MockConnector {
    pub provider: Arc<MockProvider>,
    pub requests: AtomicUsize,
}

impl MockConnector {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            requests: AtomicUsize::new(0),
        }
    }

    /// connector 与 provider 上的请求总数
    pub fn network_calls(&self) -> usize {
        self.requests.load(Ordering::SeqCst) + self.provider.request_count()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn provider(&self, _chain_id: u64) -> Result<Arc<dyn ProviderTrait>, AppError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.provider.clone())
    }
}

pub fn abi_string(value: &str) -> Bytes {
    Bytes::from(encode(&[Token::String(value.to_string())]))
}

pub fn abi_uint(value: u64) -> Bytes {
    Bytes::from(encode(&[Token::Uint(U256::from(value))]))
}

pub fn mined_tx(
    hash: H256,
    from: Address,
    to: Option<Address>,
    value: U256,
    block: u64,
) -> Transaction {
    Transaction {
        hash,
        from,
        to,
        value,
        block_number: Some(U64::from(block)),
        gas_price: Some(U256::from(1_000_000_000u64)),
        ..Default::default()
    }
}

pub fn block(number: u64, timestamp: u64, transactions: Vec<Transaction>) -> Block<Transaction> {
    Block {
        hash: Some(H256::from_low_u64_be(number)),
        number: Some(U64::from(number)),
        timestamp: U256::from(timestamp),
        transactions,
        ..Default::default()
    }
}

pub fn plain_receipt(tx_hash: H256) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash,
        status: Some(U64::one()),
        gas_used: Some(U256::from(21_000u64)),
        ..Default::default()
    }
}

pub fn transfer_receipt(
    tx_hash: H256,
    token: Address,
    from: Address,
    to: Address,
    amount: U256,
) -> TransactionReceipt {
    let mut data = [0u8; 32];
    amount.to_big_endian(&mut data);
    TransactionReceipt {
        transaction_hash: tx_hash,
        status: Some(U64::one()),
        gas_used: Some(U256::from(52_000u64)),
        logs: vec![Log {
            address: token,
            topics: vec![*ERC20_TRANSFER_TOPIC, H256::from(from), H256::from(to)],
            data: Bytes::from(data.to_vec()),
            ..Default::default()
        }],
        ..Default::default()
    }
}
