use crate::database::diesel::AsyncDbPool;
use crate::errors::error::AppError;
use crate::models::db::schema::{wallet_transactions, wallets};
use crate::models::transaction_db::{TransactionInsert, TransactionRow};
use crate::models::wallet_db::{WalletInsert, WalletRow};
use crate::models::{TransactionRecord, TransactionResponse, Wallet};
use crate::repositories::base::repository_base::RepositoryBase;
use crate::repositories::traits::repository::CacheStore;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
};
use diesel_async::RunQueryDsl;

/// PostgreSQL 缓存存储（diesel-async + bb8）
#[derive(Clone)]
pub struct PgCacheStore {
    base: RepositoryBase,
}

impl PgCacheStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            base: RepositoryBase::new(pool),
        }
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn find_wallet_by_address(&self, address: &str) -> Result<Option<Wallet>, AppError> {
        let mut conn = self.base.get_connection().await?;
        let row = wallets::table
            .filter(wallets::address.eq(address))
            .select(WalletRow::as_select())
            .first::<WalletRow>(&mut conn)
            .await
            .optional()
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(row.map(Wallet::from))
    }

    async fn upsert_wallet(&self, address: &str) -> Result<Wallet, AppError> {
        let mut conn = self.base.get_connection().await?;
        let now = Utc::now().naive_utc();
        let insert = WalletInsert {
            address: address.to_string(),
            created_at: now,
            updated_at: now,
        };
        let row = diesel::insert_into(wallets::table)
            .values(&insert)
            .on_conflict(wallets::address)
            .do_update()
            .set(wallets::updated_at.eq(now))
            .returning(WalletRow::as_returning())
            .get_result::<WalletRow>(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(row.into())
    }

    async fn ensure_wallet(&self, address: &str) -> Result<Wallet, AppError> {
        if let Some(wallet) = self.find_wallet_by_address(address).await? {
            return Ok(wallet);
        }
        {
            let mut conn = self.base.get_connection().await?;
            let now = Utc::now().naive_utc();
            // 并发创建时由唯一约束兜底
            diesel::insert_into(wallets::table)
                .values(&WalletInsert {
                    address: address.to_string(),
                    created_at: now,
                    updated_at: now,
                })
                .on_conflict(wallets::address)
                .do_nothing()
                .execute(&mut conn)
                .await
                .map_err(|e| self.base.map_diesel_error(e))?;
        }
        self.find_wallet_by_address(address)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("wallet {}", address)))
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
        let mut conn = self.base.get_connection().await?;
        let rows = wallets::table
            .order_by(wallets::id.asc())
            .select(WalletRow::as_select())
            .load::<WalletRow>(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(rows.into_iter().map(Wallet::from).collect())
    }

    async fn find_transactions_by_wallet(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Vec<TransactionResponse>, AppError> {
        let chain_id = i64::try_from(chain_id)
            .map_err(|e| AppError::Conversion(format!("chain_id 转 i64 溢出: {}", e)))?;
        let mut conn = self.base.get_connection().await?;
        let rows = wallet_transactions::table
            .filter(wallet_transactions::chain_id.eq(chain_id))
            .filter(
                wallet_transactions::from_address
                    .eq(address)
                    .or(wallet_transactions::to_address.eq(address)),
            )
            .order_by((
                wallet_transactions::timestamp.desc(),
                wallet_transactions::id.desc(),
            ))
            .select(TransactionRow::as_select())
            .load::<TransactionRow>(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;

        rows.into_iter().map(TransactionResponse::try_from).collect()
    }

    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), AppError> {
        let insert = TransactionInsert::from_record(record, Utc::now().naive_utc())?;
        let changeset = insert.changeset();
        let mut conn = self.base.get_connection().await?;
        // (hash, chain_id) 冲突时原地更新
        diesel::insert_into(wallet_transactions::table)
            .values(&insert)
            .on_conflict((wallet_transactions::hash, wallet_transactions::chain_id))
            .do_update()
            .set(&changeset)
            .execute(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(())
    }

    async fn find_transaction_by_hash(
        &self,
        hash: &str,
        chain_id: u64,
    ) -> Result<Option<TransactionResponse>, AppError> {
        let chain_id = i64::try_from(chain_id)
            .map_err(|e| AppError::Conversion(format!("chain_id 转 i64 溢出: {}", e)))?;
        let mut conn = self.base.get_connection().await?;
        let row = wallet_transactions::table
            .filter(wallet_transactions::hash.eq(hash))
            .filter(wallet_transactions::chain_id.eq(chain_id))
            .select(TransactionRow::as_select())
            .first::<TransactionRow>(&mut conn)
            .await
            .optional()
            .map_err(|e| self.base.map_diesel_error(e))?;
        row.map(TransactionResponse::try_from).transpose()
    }
}
