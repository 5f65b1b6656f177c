use crate::errors::error::AppError;
use crate::infrastructure::protocol::constants::{
    ERC20_DECIMALS_SIGNATURE, ERC20_NAME_SIGNATURE, ERC20_SYMBOL_SIGNATURE, selector,
};
use crate::infrastructure::provider::ProviderTrait;
use crate::log_debug;
use crate::models::TokenMetadata;
use ethers_core::abi::{ParamType, Token, decode};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};

async fn call_selector(
    provider: &dyn ProviderTrait,
    contract: Address,
    signature: &str,
) -> Result<Bytes, AppError> {
    let tx: TypedTransaction = TransactionRequest::new()
        .to(contract)
        .data(Bytes::from(selector(signature).to_vec()))
        .into();
    provider.call(&tx).await
}

/// string 返回值；老合约（如 MKR）返回 bytes32，去掉尾部 0 后按 UTF-8 解析
fn decode_string(data: &[u8]) -> Result<String, AppError> {
    if let Ok(tokens) = decode(&[ParamType::String], data) {
        if let Some(Token::String(s)) = tokens.into_iter().next() {
            return Ok(s);
        }
    }
    let tokens = decode(&[ParamType::FixedBytes(32)], data)
        .map_err(|e| AppError::Conversion(format!("无法解码字符串返回值: {}", e)))?;
    match tokens.into_iter().next() {
        Some(Token::FixedBytes(raw)) => {
            let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
            String::from_utf8(raw[..end].to_vec())
                .map_err(|e| AppError::Conversion(format!("bytes32 不是合法 UTF-8: {}", e)))
        }
        _ => Err(AppError::Conversion("bytes32 解码结果为空".to_string())),
    }
}

fn decode_decimals(data: &[u8]) -> Result<u8, AppError> {
    let tokens = decode(&[ParamType::Uint(8)], data)
        .map_err(|e| AppError::Conversion(format!("无法解码 decimals: {}", e)))?;
    match tokens.into_iter().next() {
        Some(Token::Uint(value)) if value <= U256::from(u8::MAX) => Ok(value.low_u32() as u8),
        Some(Token::Uint(value)) => Err(AppError::Conversion(format!(
            "decimals 超出 u8 范围: {}",
            value
        ))),
        _ => Err(AppError::Conversion("decimals 解码结果为空".to_string())),
    }
}

async fn fetch_string(
    provider: &dyn ProviderTrait,
    contract: Address,
    signature: &str,
) -> Option<String> {
    let result = call_selector(provider, contract, signature)
        .await
        .and_then(|data| decode_string(&data));
    match result {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(e) => {
            log_debug!("{:?}.{} 调用失败: {}", contract, signature, e);
            None
        }
    }
}

async fn fetch_decimals(provider: &dyn ProviderTrait, contract: Address) -> Option<u8> {
    let result = call_selector(provider, contract, ERC20_DECIMALS_SIGNATURE)
        .await
        .and_then(|data| decode_decimals(&data));
    match result {
        Ok(decimals) => Some(decimals),
        Err(e) => {
            log_debug!("{:?}.decimals() 调用失败: {}", contract, e);
            None
        }
    }
}

/// 并发读取 name/symbol/decimals
///
/// 三个调用互不影响，失败的字段为 None；本函数从不返回错误，也不做缓存。
pub async fn resolve_token_metadata(provider: &dyn ProviderTrait, contract: Address) -> TokenMetadata {
    let (name, symbol, decimals) = tokio::join!(
        fetch_string(provider, contract, ERC20_NAME_SIGNATURE),
        fetch_string(provider, contract, ERC20_SYMBOL_SIGNATURE),
        fetch_decimals(provider, contract),
    );
    TokenMetadata {
        name,
        symbol,
        decimals,
    }
}
