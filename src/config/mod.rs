pub mod config;
pub mod network_config;

pub use self::config::*;
pub use network_config::{NetworkConfig, NetworkRegistry};
