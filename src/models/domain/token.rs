use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// 代币合约元数据，任一字段都可能因合约不规范而缺失
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

impl TokenMetadata {
    pub fn decimals_or_default(&self) -> u8 {
        self.decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS)
    }

    /// 三个字段都没拿到，视为解析失败，不写缓存
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.symbol.is_none() && self.decimals.is_none()
    }
}
