pub mod enrichment_service;
pub mod error_sink;
pub mod fetch_service;
pub mod pagination;
pub mod reconcile_service;
pub mod sync_registry;
pub mod sync_service;
pub mod token_service;
pub mod wallet_service;

pub use error_sink::{ErrorSink, FailureStage, LogErrorSink};
pub use sync_registry::SyncStatus;
pub use wallet_service::{WalletService, WalletServiceDeps};
