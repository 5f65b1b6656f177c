use crate::models::{Page, PageRequest, TransactionResponse, TxFilter};

fn matches(tx: &TransactionResponse, wallet: &str, filter: Option<TxFilter>) -> bool {
    match filter {
        Some(TxFilter::Sent) => tx.from_address == wallet,
        Some(TxFilter::Received) => tx.to_address == wallet,
        None => true,
    }
}

/// 先按方向过滤，再切页；total 为过滤后的数量
///
/// `wallet` 需为小写地址，`request` 已经过 `PageRequest::new` 规整。
pub fn paginate(
    txs: Vec<TransactionResponse>,
    wallet: &str,
    filter: Option<TxFilter>,
    request: PageRequest,
) -> Page<TransactionResponse> {
    let filtered: Vec<TransactionResponse> = txs
        .into_iter()
        .filter(|tx| matches(tx, wallet, filter))
        .collect();
    let total = filtered.len();
    let limit = request.limit.max(1);
    let total_pages = total.div_ceil(limit);
    let items = match request.skip() {
        Some(skip) => filtered.into_iter().skip(skip).take(limit).collect(),
        None => Vec::new(),
    };
    Page {
        items,
        total,
        total_pages,
        has_more: request.page < total_pages,
    }
}
