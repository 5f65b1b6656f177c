pub mod schema;
pub mod transaction_db;
pub mod wallet_db;
