pub mod db;
pub mod domain;

pub use db::{schema, transaction_db, wallet_db};
pub use domain::*;
