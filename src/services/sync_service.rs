use crate::errors::error::AppError;
use crate::services::enrichment_service::EnrichmentService;
use crate::services::error_sink::{ErrorSink, FailureStage};
use crate::services::fetch_service::FetchService;
use crate::services::reconcile_service::ReconcileService;
use crate::services::sync_registry::{SyncKey, SyncRegistry, SyncStatus};
use crate::{log_debug, log_info};
use std::sync::Arc;

/// 拉取 → 补全 → 写缓存
#[derive(Clone)]
pub struct SyncService {
    fetch: Arc<FetchService>,
    enrichment: Arc<EnrichmentService>,
    reconcile: Arc<ReconcileService>,
    registry: Arc<SyncRegistry>,
    error_sink: Arc<dyn ErrorSink>,
    limit: usize,
}

impl SyncService {
    pub fn new(
        fetch: Arc<FetchService>,
        enrichment: Arc<EnrichmentService>,
        reconcile: Arc<ReconcileService>,
        registry: Arc<SyncRegistry>,
        error_sink: Arc<dyn ErrorSink>,
        limit: usize,
    ) -> Self {
        Self {
            fetch,
            enrichment,
            reconcile,
            registry,
            error_sink,
            limit,
        }
    }

    pub async fn status(&self, address: &str, chain_id: u64) -> Option<SyncStatus> {
        self.registry.status(&SyncKey::new(address, chain_id)).await
    }

    /// 前台同步：等待同键的其它同步结束后执行
    pub async fn sync(&self, address: &str, chain_id: u64) -> Result<usize, AppError> {
        let key = SyncKey::new(address, chain_id);
        let lock = self.registry.lock_for(&key).await;
        let _guard = lock.lock().await;

        self.registry.set_status(&key, SyncStatus::Running).await;
        let result = self.run(&key.address, chain_id).await;
        let status = match &result {
            Ok(synced) => SyncStatus::Done { synced: *synced },
            Err(e) => SyncStatus::Failed {
                error: e.to_string(),
            },
        };
        self.registry.set_status(&key, status).await;
        result
    }

    /// 后台同步，不等待结果；同键已有同步在排队或执行时返回 false
    pub async fn spawn_background(&self, address: &str, chain_id: u64) -> bool {
        let key = SyncKey::new(address, chain_id);
        if !self.registry.try_schedule(&key).await {
            log_debug!("{} chain={} 已有同步任务，忽略", key.address, chain_id);
            return false;
        }
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.sync(&key.address, key.chain_id).await {
                let context = format!("{}@{}", key.address, key.chain_id);
                this.error_sink
                    .report(FailureStage::BackgroundSync, &context, &e);
            }
        });
        true
    }

    async fn run(&self, address: &str, chain_id: u64) -> Result<usize, AppError> {
        let fetched = self.fetch.fetch(address, chain_id, self.limit).await;
        if fetched.is_empty() {
            log_info!("{} chain={} 没有可同步的交易", address, chain_id);
            return Ok(0);
        }
        let total = fetched.len();
        let enriched = self.enrichment.enrich_all(fetched, chain_id).await;
        let written = self
            .reconcile
            .reconcile(Some(address), chain_id, &enriched)
            .await;
        log_info!(
            "同步完成 address={} chain={} 写入 {}/{}",
            address,
            chain_id,
            written,
            total
        );
        // 一行都没写进去说明缓存不可用，状态记为失败
        if written == 0 {
            return Err(AppError::Internal(format!(
                "{} 笔交易均未能写入缓存",
                total
            )));
        }
        Ok(written)
    }
}
