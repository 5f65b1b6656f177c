pub mod connector;
pub mod ethereum_provider;
#[cfg(test)]
pub mod mock;

pub use connector::{ChainConnector, Connector};
pub use ethereum_provider::{EthereumProvider, ProviderTrait};
