use crate::errors::error::AppError;
use crate::models::db::schema::wallet_transactions;
use crate::models::domain::transaction::{TokenTransfer, TransactionRecord, TransactionResponse};
use chrono::NaiveDateTime;
use diesel::{AsChangeset, Insertable, Queryable, Selectable};

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = wallet_transactions)]
pub struct TransactionInsert {
    pub wallet_id: Option<i64>,
    pub hash: String,
    pub chain_id: i64,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub gas_price: Option<i64>,
    pub timestamp: i64,
    pub status: String,
    pub token_address: Option<String>,
    pub token_from: Option<String>,
    pub token_to: Option<String>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub token_decimals: Option<i16>,
    pub token_amount_raw: Option<String>,
    pub token_amount: Option<String>,
    pub receipt_checked: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 冲突时的更新集合：None 字段不覆盖已有值
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = wallet_transactions)]
pub struct TransactionChangeset {
    pub wallet_id: Option<i64>,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub gas_price: Option<i64>,
    pub timestamp: i64,
    pub status: String,
    pub token_address: Option<String>,
    pub token_from: Option<String>,
    pub token_to: Option<String>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub token_decimals: Option<i16>,
    pub token_amount_raw: Option<String>,
    pub token_amount: Option<String>,
    /// 只会从 false 变为 true
    pub receipt_checked: Option<bool>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = wallet_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransactionRow {
    pub id: i64,
    pub wallet_id: Option<i64>,
    pub hash: String,
    pub chain_id: i64,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub gas_price: Option<i64>,
    pub timestamp: i64,
    pub status: String,
    pub token_address: Option<String>,
    pub token_from: Option<String>,
    pub token_to: Option<String>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub token_decimals: Option<i16>,
    pub token_amount_raw: Option<String>,
    pub token_amount: Option<String>,
    pub receipt_checked: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TransactionInsert {
    pub fn from_record(record: &TransactionRecord, now: NaiveDateTime) -> Result<Self, AppError> {
        let chain_id = i64::try_from(record.chain_id).map_err(|e| {
            AppError::Conversion(format!("chain_id({}) 转 i64 溢出: {}", record.chain_id, e))
        })?;
        let tx = &record.tx;
        let token = tx.token_transfer.as_ref();
        Ok(Self {
            wallet_id: record.wallet_id,
            hash: tx.hash.to_lowercase(),
            chain_id,
            from_address: tx.from_address.to_lowercase(),
            to_address: tx.to_address.to_lowercase(),
            amount: tx.amount.clone(),
            block_number: tx.block_number,
            gas_used: tx.gas_used,
            gas_price: tx.gas_price,
            timestamp: tx.timestamp,
            status: tx.status.as_str().to_string(),
            token_address: token.map(|t| t.contract_address.to_lowercase()),
            token_from: token.map(|t| t.from.to_lowercase()),
            token_to: token.map(|t| t.to.to_lowercase()),
            token_name: token.and_then(|t| t.name.clone()),
            token_symbol: token.and_then(|t| t.symbol.clone()),
            token_decimals: token.map(|t| i16::from(t.decimals)),
            token_amount_raw: token.map(|t| t.amount_raw.clone()),
            token_amount: token.map(|t| t.amount.clone()),
            receipt_checked: tx.receipt_checked,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn changeset(&self) -> TransactionChangeset {
        TransactionChangeset {
            wallet_id: self.wallet_id,
            from_address: self.from_address.clone(),
            to_address: self.to_address.clone(),
            amount: self.amount.clone(),
            block_number: self.block_number,
            gas_used: self.gas_used,
            gas_price: self.gas_price,
            timestamp: self.timestamp,
            status: self.status.clone(),
            token_address: self.token_address.clone(),
            token_from: self.token_from.clone(),
            token_to: self.token_to.clone(),
            token_name: self.token_name.clone(),
            token_symbol: self.token_symbol.clone(),
            token_decimals: self.token_decimals,
            token_amount_raw: self.token_amount_raw.clone(),
            token_amount: self.token_amount.clone(),
            receipt_checked: self.receipt_checked.then_some(true),
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<TransactionRow> for TransactionResponse {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e: String| AppError::Conversion(format!("交易 {}: {}", row.hash, e)))?;

        let token_transfer = match (row.token_address, row.token_amount_raw, row.token_amount) {
            (Some(contract_address), Some(amount_raw), Some(amount)) => {
                let decimals = row
                    .token_decimals
                    .map(u8::try_from)
                    .transpose()
                    .map_err(|e| {
                        AppError::Conversion(format!("交易 {}: token_decimals 越界: {}", row.hash, e))
                    })?
                    .unwrap_or(crate::models::domain::token::DEFAULT_TOKEN_DECIMALS);
                Some(TokenTransfer {
                    contract_address,
                    from: row.token_from.unwrap_or_default(),
                    to: row.token_to.unwrap_or_default(),
                    name: row.token_name,
                    symbol: row.token_symbol,
                    decimals,
                    amount_raw,
                    amount,
                })
            }
            _ => None,
        };

        Ok(Self {
            hash: row.hash,
            from_address: row.from_address,
            to_address: row.to_address,
            amount: row.amount,
            block_number: row.block_number,
            gas_used: row.gas_used,
            gas_price: row.gas_price,
            timestamp: row.timestamp,
            status,
            token_transfer,
            receipt_checked: row.receipt_checked,
        })
    }
}
