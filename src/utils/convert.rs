use crate::errors::error::AppError;
use ethers_core::types::{Address, H256, U64, U256};

pub fn option_u64_to_i64(opt_u64: Option<U64>) -> Result<i64, AppError> {
    let u64_val = opt_u64
        .ok_or(AppError::Conversion("Block number is None".to_string()))?
        .as_u64();

    // u64 转 i64（溢出检查）
    u64_val
        .try_into()
        .map_err(|e| AppError::Conversion(format!("u64({}) 转 i64 溢出: {}", u64_val, e)))
}

pub fn h256_to_string(data: H256) -> String {
    // 0x + 64 位小写 hex
    format!("{:#x}", data)
}

/// 0x + 40 位小写 hex（不带校验和）
pub fn address_to_string(address: Address) -> String {
    format!("{:#x}", address)
}

pub fn opt_u256_to_i64_loose(opt_u256: Option<U256>) -> Result<i64, AppError> {
    // 宽松策略：如果输入是 None，视为 U256::zero()
    let u256_val = opt_u256.unwrap_or(U256::zero());

    // U256 内部是 [u64; 4]，索引0=最低64位
    let parts: [u64; 4] = u256_val.0;
    let low_u64 = parts[0];

    if parts[1] != 0 || parts[2] != 0 || parts[3] != 0 || low_u64 > i64::MAX as u64 {
        return Err(AppError::Conversion(format!(
            "U256({}) 超出 i64 范围（i64最大值: {}）",
            u256_val,
            i64::MAX
        )));
    }
    Ok(low_u64 as i64)
}

/// 区块时间戳 U256 → unix 秒
pub fn timestamp_to_i64(ts: U256) -> i64 {
    opt_u256_to_i64_loose(Some(ts)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_to_i64_bounds() {
        assert_eq!(opt_u256_to_i64_loose(None).unwrap(), 0);
        assert_eq!(opt_u256_to_i64_loose(Some(U256::from(21_000u64))).unwrap(), 21_000);
        assert!(opt_u256_to_i64_loose(Some(U256::from(u64::MAX))).is_err());
        assert!(opt_u256_to_i64_loose(Some(U256::exp10(30))).is_err());
    }

    #[test]
    fn hex_strings_are_lowercase_and_prefixed() {
        let addr = Address::repeat_byte(0xAB);
        assert_eq!(address_to_string(addr), format!("0x{}", "ab".repeat(20)));
        assert_eq!(h256_to_string(H256::zero()), format!("0x{}", "0".repeat(64)));
        assert_eq!(option_u64_to_i64(Some(U64::from(7u64))).unwrap(), 7);
        assert!(option_u64_to_i64(None).is_err());
    }
}
