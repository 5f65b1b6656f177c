pub mod base;
pub mod memory_repository;
pub mod pg_repository;
pub mod token_cache;
pub mod traits;

pub use memory_repository::MemoryCacheStore;
pub use pg_repository::PgCacheStore;
pub use token_cache::{MemoryTokenCache, RedisTokenCache};
pub use traits::repository::{CacheStore, TokenCache};
