use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheBackend, Config, NetworkRegistry, RefreshConfig};
use crate::database::diesel::create_async_db_pool;
use crate::database::redis::create_redis_pool;
use crate::errors::error::AppError;
use crate::infrastructure::indexer::IndexerClient;
use crate::infrastructure::provider::{ChainConnector, Connector};
use crate::repositories::{
    CacheStore, MemoryCacheStore, MemoryTokenCache, PgCacheStore, RedisTokenCache, TokenCache,
};
use crate::services::{ErrorSink, LogErrorSink, WalletService, WalletServiceDeps};
use crate::{log_info, log_warn};

pub type Result<T> = std::result::Result<T, AppError>;

/// 应用程序启动与管理结构体（后台刷新，无HTTP API）
pub struct Application {
    pub wallet_service: Arc<WalletService>,
    connector: Arc<dyn Connector>,
    refresh: RefreshConfig,
}

impl Application {
    /// 构建应用实例：网络表、provider 连接器、缓存后端与服务
    pub async fn build(config: Config) -> Result<Self> {
        let networks = Arc::new(NetworkRegistry::new(
            &config.networks,
            config.default_chain_id,
        )?);
        log_info!(
            "Network registry loaded, default chain {}",
            networks.default_chain_id()
        );
        let connector: Arc<dyn Connector> = Arc::new(ChainConnector::new(networks.clone()));

        let (store, token_cache): (Arc<dyn CacheStore>, Arc<dyn TokenCache>) =
            match config.cache.backend {
                CacheBackend::Postgres => {
                    let db_pool = create_async_db_pool(&config.database).await?;
                    log_info!("Diesel database pool initialized successfully");
                    let redis = create_redis_pool(&config.redis).await?;
                    let store: Arc<dyn CacheStore> = Arc::new(PgCacheStore::new(db_pool));
                    let token_cache: Arc<dyn TokenCache> =
                        Arc::new(RedisTokenCache::new(redis, config.cache.token_ttl_secs));
                    (store, token_cache)
                }
                CacheBackend::Memory => {
                    log_warn!("Using in-memory cache backend, nothing is persisted");
                    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
                    let token_cache: Arc<dyn TokenCache> = Arc::new(MemoryTokenCache::new());
                    (store, token_cache)
                }
            };

        let indexer = Arc::new(IndexerClient::new(&config.indexer)?);
        if !indexer.has_api_key() {
            log_warn!("Indexer API key not set, falling back to block scan only");
        }
        let error_sink: Arc<dyn ErrorSink> = Arc::new(LogErrorSink);

        let wallet_service = Arc::new(WalletService::new(WalletServiceDeps {
            connector: connector.clone(),
            networks,
            store,
            token_cache,
            indexer,
            scan: config.scan,
            sync_limit: config.sync.limit,
            error_sink,
        }));

        Ok(Self {
            wallet_service,
            connector,
            refresh: config.refresh,
        })
    }

    /// 启动定时刷新，等待 Ctrl+C 后释放连接
    pub async fn run(self) -> anyhow::Result<()> {
        let refresh_task = if self.refresh.enabled() {
            let service = self.wallet_service.clone();
            let refresh = self.refresh.clone();
            Some(tokio::spawn(async move {
                let mut ticker =
                    tokio::time::interval(Duration::from_secs(refresh.interval_secs));
                loop {
                    ticker.tick().await;
                    if let Err(e) = service.refresh_all(&refresh.chain_ids).await {
                        tracing::error!("定时刷新失败: {:?}", e);
                    }
                }
            }))
        } else {
            log_info!("Periodic refresh disabled");
            None
        };

        log_info!("✔️ Wallet cache service started");

        // 等待 Ctrl+C 退出
        tokio::signal::ctrl_c().await?;
        log_info!("⚠️  Received shutdown signal, exiting...");

        if let Some(task) = refresh_task {
            task.abort();
        }
        self.connector.shutdown().await;
        Ok(())
    }
}
