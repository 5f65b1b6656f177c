use crate::errors::error::AppError;
use ethers_core::types::{Address, H256};

/// 校验 0x 前缀 + 指定长度的十六进制串
fn is_prefixed_hex(value: &str, hex_len: usize) -> bool {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(body) => body.len() == hex_len && hex::decode(body).is_ok(),
        None => false,
    }
}

/// 校验钱包地址格式并返回小写形式（不做 EIP-55 校验和检查）
pub fn validate_address(address: &str) -> Result<String, AppError> {
    let trimmed = address.trim();
    if !is_prefixed_hex(trimmed, 40) {
        return Err(AppError::InvalidAddress(address.to_string()));
    }
    Ok(trimmed.to_lowercase())
}

pub fn parse_address(address: &str) -> Result<Address, AppError> {
    validate_address(address)?
        .parse::<Address>()
        .map_err(|_| AppError::InvalidAddress(address.to_string()))
}

/// 校验交易哈希格式并返回小写形式
pub fn validate_tx_hash(hash: &str) -> Result<String, AppError> {
    let trimmed = hash.trim();
    if !is_prefixed_hex(trimmed, 64) {
        return Err(AppError::InvalidTxHash(hash.to_string()));
    }
    Ok(trimmed.to_lowercase())
}

pub fn parse_tx_hash(hash: &str) -> Result<H256, AppError> {
    validate_tx_hash(hash)?
        .parse::<H256>()
        .map_err(|_| AppError::InvalidTxHash(hash.to_string()))
}
