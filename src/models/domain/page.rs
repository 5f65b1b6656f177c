use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::domain::transaction::TransactionResponse;

pub const MAX_PAGE_LIMIT: usize = 100;

/// 交易方向过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxFilter {
    Sent,
    Received,
}

impl FromStr for TxFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sent" => Ok(TxFilter::Sent),
            "received" => Ok(TxFilter::Received),
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

/// 分页参数，页码从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    /// 路由层使用：limit 限制在 [1,100]，page 至少为 1
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// 需要跳过的条数；页码大到溢出时返回 None
    pub fn skip(&self) -> Option<usize> {
        self.page.saturating_sub(1).checked_mul(self.limit.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

/// get_transactions 的返回结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPage {
    pub transactions: Vec<TransactionResponse>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl TransactionsPage {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            transactions: Vec::new(),
            total: 0,
            page: request.page,
            limit: request.limit,
            total_pages: 0,
            has_more: false,
        }
    }

    pub fn from_page(page: Page<TransactionResponse>, request: PageRequest) -> Self {
        Self {
            transactions: page.items,
            total: page.total,
            page: request.page,
            limit: request.limit,
            total_pages: page.total_pages,
            has_more: page.has_more,
        }
    }
}
