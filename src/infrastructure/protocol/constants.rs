use ethers_core::types::H256;
use ethers_core::utils::keccak256;
use once_cell::sync::Lazy;

/// keccak256("Transfer(address,address,uint256)")
pub static ERC20_TRANSFER_TOPIC: Lazy<H256> =
    Lazy::new(|| H256::from(keccak256("Transfer(address,address,uint256)")));

/// ERC-20 只读方法签名
pub const ERC20_NAME_SIGNATURE: &str = "name()";
pub const ERC20_SYMBOL_SIGNATURE: &str = "symbol()";
pub const ERC20_DECIMALS_SIGNATURE: &str = "decimals()";

/// 4 字节函数选择器
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}
