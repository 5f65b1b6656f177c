use crate::utils::format::{format_native, format_units_exact};
use crate::utils::{address_to_string, h256_to_string, opt_u256_to_i64_loose, option_u64_to_i64};
use ethers_core::types::{Address, Transaction, TransactionReceipt, U64, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 链上执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
        }
    }

    /// 收据 status: 1=成功 0=失败，缺失时按成功处理（拜占庭之前的区块没有该字段）
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        match receipt.status {
            Some(s) if s == U64::zero() => TxStatus::Failed,
            _ => TxStatus::Success,
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(TxStatus::Success),
            "failed" => Ok(TxStatus::Failed),
            other => Err(format!("unknown tx status '{}'", other)),
        }
    }
}

/// 从收据日志中识别出的 ERC-20 Transfer（尚未补全元数据）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedTransfer {
    pub contract_address: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// 补全元数据后的代币转账
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub contract_address: String,
    pub from: String,
    pub to: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: u8,
    /// 最小单位的原始数量
    pub amount_raw: String,
    /// amount_raw / 10^decimals
    pub amount: String,
}

impl TokenTransfer {
    pub fn from_detected(
        detected: &DetectedTransfer,
        name: Option<String>,
        symbol: Option<String>,
        decimals: u8,
    ) -> Self {
        Self {
            contract_address: address_to_string(detected.contract_address),
            from: address_to_string(detected.from),
            to: address_to_string(detected.to),
            name,
            symbol,
            decimals,
            amount_raw: detected.amount.to_string(),
            amount: format_units_exact(detected.amount, decimals),
        }
    }
}

/// 抓取器产出、补全阶段消费的标准化交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub hash: String,
    pub from_address: String,
    pub to_address: String,
    /// 原生币单位（ETH）的十进制字符串
    pub amount: String,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub gas_price: Option<i64>,
    pub timestamp: i64,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_transfer: Option<TokenTransfer>,
    /// 已按收据检查过代币转账，读取时不再补全
    #[serde(skip)]
    pub receipt_checked: bool,
}

impl TransactionResponse {
    /// 由链上交易 + 可选收据构建，收据缺失时 gas_used 为空、状态按成功处理
    pub fn from_ethers(
        tx: &Transaction,
        receipt: Option<&TransactionReceipt>,
        timestamp: i64,
    ) -> Self {
        Self {
            hash: h256_to_string(tx.hash),
            from_address: address_to_string(tx.from),
            to_address: tx.to.map(address_to_string).unwrap_or_default(),
            amount: format_native(tx.value),
            block_number: option_u64_to_i64(tx.block_number).ok(),
            gas_used: receipt
                .and_then(|r| r.gas_used)
                .and_then(|g| opt_u256_to_i64_loose(Some(g)).ok()),
            gas_price: receipt
                .and_then(|r| r.effective_gas_price)
                .or(tx.gas_price)
                .and_then(|g| opt_u256_to_i64_loose(Some(g)).ok()),
            timestamp,
            status: receipt.map(TxStatus::from_receipt).unwrap_or(TxStatus::Success),
            token_transfer: None,
            receipt_checked: false,
        }
    }

    /// 还需要按收据补全代币转账
    pub fn needs_enrichment(&self) -> bool {
        self.token_transfer.is_none() && !self.receipt_checked
    }

    pub fn involves(&self, wallet: &str) -> bool {
        self.from_address == wallet || self.to_address == wallet
    }

    /// 地址统一小写，保证 (hash, chain_id) 去重与方向过滤一致
    pub fn normalized(mut self) -> Self {
        self.hash = self.hash.to_lowercase();
        self.from_address = self.from_address.to_lowercase();
        self.to_address = self.to_address.to_lowercase();
        self
    }
}

/// 写入缓存的一条交易
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub chain_id: u64,
    pub wallet_id: Option<i64>,
    pub tx: TransactionResponse,
}
