use crate::infrastructure::protocol::constants::ERC20_TRANSFER_TOPIC;
use crate::log_debug;
use crate::models::DetectedTransfer;
use ethers_core::types::{H160, Log, TransactionReceipt, U256};

/// 单条日志是否为标准 ERC-20 Transfer（3 个 topic：签名 + from + to）
fn is_transfer_log(log: &Log) -> bool {
    log.topics.len() == 3 && log.topics[0] == *ERC20_TRANSFER_TOPIC
}

fn decode_transfer_log(log: &Log) -> Option<DetectedTransfer> {
    let data = log.data.as_ref();
    // data 为 uint256，空或超过 32 字节都视为畸形日志
    if data.is_empty() || data.len() > 32 {
        return None;
    }
    Some(DetectedTransfer {
        contract_address: log.address,
        from: H160::from(log.topics[1]),
        to: H160::from(log.topics[2]),
        amount: U256::from_big_endian(data),
    })
}

/// 按顺序扫描收据日志，返回第一条 ERC-20 Transfer
///
/// 畸形日志跳过继续扫描；没有匹配返回 None。一笔交易里的多次转账（如 DEX swap）
/// 只取第一条。
pub fn detect_transfer(receipt: &TransactionReceipt) -> Option<DetectedTransfer> {
    for log in receipt.logs.iter().filter(|log| is_transfer_log(log)) {
        match decode_transfer_log(log) {
            Some(transfer) => return Some(transfer),
            None => {
                log_debug!(
                    "交易 {:?} 的 Transfer 日志 data 长度异常({})，跳过",
                    receipt.transaction_hash,
                    log.data.len()
                );
            }
        }
    }
    None
}
