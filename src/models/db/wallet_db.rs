use crate::models::db::schema::wallets;
use crate::models::domain::wallet::Wallet;
use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = wallets)]
pub struct WalletInsert {
    pub address: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WalletRow {
    pub id: i64,
    pub address: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<WalletRow> for Wallet {
    fn from(row: WalletRow) -> Self {
        Self {
            id: row.id,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
