pub mod indexer;
pub mod parser;
pub mod protocol;
pub mod provider;
