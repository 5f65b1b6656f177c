pub mod page;
pub mod token;
pub mod transaction;
pub mod wallet;

pub use page::{Page, PageRequest, TransactionsPage, TxFilter};
pub use token::TokenMetadata;
pub use transaction::{DetectedTransfer, TokenTransfer, TransactionRecord, TransactionResponse, TxStatus};
pub use wallet::{BalanceResponse, SyncResponse, Wallet};
