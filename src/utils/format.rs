use bigdecimal::BigDecimal;
use ethers_core::types::U256;
use std::str::FromStr;

pub const NATIVE_DECIMALS: u8 = 18;

/// 将U256 BigDecimal
pub fn u256_to_bigdecimal(value: U256) -> BigDecimal {
    // 先转字符串再转 BigDecimal，处理大数最稳
    let s = value.to_string();
    BigDecimal::from_str(&s).unwrap_or_else(|_| BigDecimal::from(0))
}

/// raw / 10^decimals，十进制精确换算，去掉末尾多余的 0
///
/// 1500000000000000000 (18) → "1.5"，1500000 (6) → "1.5"，0 → "0"
pub fn format_units_exact(raw: U256, decimals: u8) -> String {
    let (digits, _) = u256_to_bigdecimal(raw).as_bigint_and_exponent();
    BigDecimal::new(digits, i64::from(decimals))
        .normalized()
        .to_plain_string()
}

/// wei → ETH
pub fn format_native(wei: U256) -> String {
    format_units_exact(wei, NATIVE_DECIMALS)
}

/// 索引器返回的 wei 十进制字符串 → ETH，非法输入返回 None
pub fn format_native_str(wei: &str) -> Option<String> {
    U256::from_dec_str(wei.trim()).ok().map(format_native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_token_amounts_exactly() {
        let raw = U256::from_dec_str("1500000000000000000").unwrap();
        assert_eq!(format_units_exact(raw, 18), "1.5");
        assert_eq!(format_units_exact(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units_exact(U256::zero(), 18), "0");
        assert_eq!(format_units_exact(U256::from(1000u64), 0), "1000");
        assert_eq!(format_units_exact(U256::from(1u64), 18), "0.000000000000000001");
    }

    #[test]
    fn keeps_full_precision_of_large_values() {
        // 超过 f64 精度的数量
        let raw = U256::from_dec_str("123456789012345678901234567890").unwrap();
        assert_eq!(format_units_exact(raw, 18), "123456789012.34567890123456789");
        assert_eq!(format_units_exact(U256::MAX, 0), U256::MAX.to_string());
    }

    #[test]
    fn native_string_conversion() {
        assert_eq!(format_native_str("2000000000000000000").as_deref(), Some("2"));
        assert_eq!(format_native_str(" 0 ").as_deref(), Some("0"));
        assert_eq!(format_native_str("abc"), None);
    }
}
