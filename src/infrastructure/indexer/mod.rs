mod etherscan_client;

pub use etherscan_client::{EtherscanTx, IndexerClient};
