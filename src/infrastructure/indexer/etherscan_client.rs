use crate::config::IndexerConfig;
use crate::errors::error::AppError;
use crate::models::{TransactionResponse, TxStatus};
use crate::utils::format::format_native_str;
use crate::{log_debug, log_warn};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Etherscan 风格的 API 外层包裹：status "1" 成功，其余时 result 是错误描述字符串
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// module=account&action=txlist 的单条记录，数字字段都是字符串
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtherscanTx {
    pub block_number: String,
    pub time_stamp: String,
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub gas_price: String,
    #[serde(default)]
    pub gas_used: String,
    #[serde(default)]
    pub is_error: String,
    #[serde(default, rename = "txreceipt_status")]
    pub txreceipt_status: String,
}

fn parse_opt_i64(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

impl EtherscanTx {
    /// 转成标准化交易；哈希、value、时间戳不可解析时返回 None
    pub fn into_response(self) -> Option<TransactionResponse> {
        let amount = format_native_str(&self.value)?;
        let timestamp = parse_opt_i64(&self.time_stamp)?;
        if self.hash.is_empty() {
            return None;
        }
        let failed = self.is_error == "1" || self.txreceipt_status == "0";
        Some(
            TransactionResponse {
                hash: self.hash,
                from_address: self.from,
                to_address: self.to,
                amount,
                block_number: parse_opt_i64(&self.block_number),
                gas_used: parse_opt_i64(&self.gas_used),
                gas_price: parse_opt_i64(&self.gas_price),
                timestamp,
                status: if failed { TxStatus::Failed } else { TxStatus::Success },
                token_transfer: None,
                receipt_checked: false,
            }
            .normalized(),
        )
    }
}

/// 把 API 响应体解析为交易列表；status != "1"（限流、无结果等）按空列表处理
fn parse_txlist(body: EtherscanResponse) -> Result<Vec<EtherscanTx>, AppError> {
    if body.status != "1" {
        let detail = body.result.as_str().unwrap_or_default().to_string();
        return Err(AppError::Indexer(format!("{} {}", body.message, detail)));
    }
    serde_json::from_value(body.result).map_err(AppError::from)
}

/// 索引器客户端（主路径）
pub struct IndexerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl IndexerClient {
    pub fn new(config: &IndexerConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request_txlist(
        &self,
        api_key: &str,
        address: &str,
        chain_id: u64,
        limit: usize,
    ) -> Result<Vec<EtherscanTx>, AppError> {
        let chain_id = chain_id.to_string();
        let offset = limit.to_string();
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("chainid", chain_id.as_str()),
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
                ("apikey", api_key),
            ],
        )
        .map_err(|e| AppError::Config(format!("索引器 base_url 无效 '{}': {}", self.base_url, e)))?;
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Indexer(format!("HTTP {}", response.status())));
        }
        let body: EtherscanResponse = response.json().await?;
        parse_txlist(body)
    }

    /// 拉取地址的交易列表（最新在前，最多 limit 条）
    ///
    /// 任何失败（无 key、HTTP 错误、限流、无结果）都返回空列表，交由区块扫描兜底。
    pub async fn fetch_transactions(
        &self,
        address: &str,
        chain_id: u64,
        limit: usize,
    ) -> Vec<TransactionResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            log_debug!("未配置索引器 API key，跳过索引器: {}", address);
            return Vec::new();
        };

        match self.request_txlist(api_key, address, chain_id, limit).await {
            Ok(entries) => entries
                .into_iter()
                .filter_map(EtherscanTx::into_response)
                .take(limit)
                .collect(),
            Err(e) => {
                log_warn!("索引器拉取失败 address={} chain={}: {}", address, chain_id, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> serde_json::Value {
        serde_json::json!({
            "blockNumber": "5123456",
            "timeStamp": "1700000000",
            "hash": "0xABCDEF0000000000000000000000000000000000000000000000000000000001",
            "from": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            "value": "1500000000000000000",
            "gas": "21000",
            "gasPrice": "30000000000",
            "gasUsed": "21000",
            "isError": "0",
            "txreceipt_status": "1",
            "input": "0x"
        })
    }

    #[test]
    fn maps_entry_to_normalized_transaction() {
        let entry: EtherscanTx = serde_json::from_value(sample_entry()).unwrap();
        let tx = entry.into_response().unwrap();
        assert_eq!(tx.amount, "1.5");
        assert_eq!(tx.from_address, format!("0x{}", "a".repeat(40)));
        assert_eq!(
            tx.hash,
            "0xabcdef0000000000000000000000000000000000000000000000000000000001"
        );
        assert_eq!(tx.block_number, Some(5_123_456));
        assert_eq!(tx.gas_used, Some(21_000));
        assert_eq!(tx.gas_price, Some(30_000_000_000));
        assert_eq!(tx.timestamp, 1_700_000_000);
        assert_eq!(tx.status, TxStatus::Success);
    }

    #[test]
    fn error_flag_marks_failed() {
        let mut raw = sample_entry();
        raw["isError"] = serde_json::json!("1");
        let entry: EtherscanTx = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.into_response().unwrap().status, TxStatus::Failed);
    }

    #[test]
    fn non_success_status_is_an_indexer_error() {
        let no_results: EtherscanResponse = serde_json::from_value(serde_json::json!({
            "status": "0",
            "message": "No transactions found",
            "result": []
        }))
        .unwrap();
        assert!(matches!(parse_txlist(no_results), Err(AppError::Indexer(_))));

        let rate_limited: EtherscanResponse = serde_json::from_value(serde_json::json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        }))
        .unwrap();
        let err = parse_txlist(rate_limited).unwrap_err();
        assert!(err.to_string().contains("Max rate limit reached"));

        let ok: EtherscanResponse = serde_json::from_value(serde_json::json!({
            "status": "1",
            "message": "OK",
            "result": [sample_entry()]
        }))
        .unwrap();
        assert_eq!(parse_txlist(ok).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_api_key_skips_request() {
        let client = IndexerClient::new(&IndexerConfig {
            // 不可达地址：若真的发出请求会超时/失败，但应该根本不会发
            base_url: "http://127.0.0.1:9/api".to_string(),
            api_key: Some("   ".to_string()),
            timeout_secs: 1,
        })
        .unwrap();
        assert!(!client.has_api_key());
        let txs = client
            .fetch_transactions(&format!("0x{}", "a".repeat(40)), 1, 10)
            .await;
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn transport_error_degrades_to_empty() {
        let client = IndexerClient::new(&IndexerConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            api_key: Some("key".to_string()),
            timeout_secs: 1,
        })
        .unwrap();
        let txs = client
            .fetch_transactions(&format!("0x{}", "a".repeat(40)), 1, 10)
            .await;
        assert!(txs.is_empty());
    }
}
