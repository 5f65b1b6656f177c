use crate::config::network_config::NetworkRegistry;
use crate::errors::error::AppError;
use crate::infrastructure::provider::ethereum_provider::{EthereumProvider, ProviderTrait};
use crate::{log_debug, log_info};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 按 chain id 获取 provider
#[async_trait]
pub trait Connector: Send + Sync {
    async fn provider(&self, chain_id: u64) -> Result<Arc<dyn ProviderTrait>, AppError>;

    /// 释放已建立的连接
    async fn shutdown(&self) {}
}

/// 每条链一个 provider，首次使用时创建，之后复用
pub struct ChainConnector {
    networks: Arc<NetworkRegistry>,
    providers: RwLock<HashMap<u64, Arc<dyn ProviderTrait>>>,
}

impl ChainConnector {
    pub fn new(networks: Arc<NetworkRegistry>) -> Self {
        Self {
            networks,
            providers: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Connector for ChainConnector {
    async fn provider(&self, chain_id: u64) -> Result<Arc<dyn ProviderTrait>, AppError> {
        // 未识别的 chain id 解析到默认网络，共用同一个 provider
        let network = self.networks.get(chain_id);
        if let Some(p) = self.providers.read().await.get(&network.chain_id) {
            return Ok(p.clone());
        }

        let mut guard = self.providers.write().await;
        // 双重检查：等写锁期间可能已被其他任务创建
        if let Some(p) = guard.get(&network.chain_id) {
            return Ok(p.clone());
        }
        let provider: Arc<dyn ProviderTrait> =
            Arc::new(EthereumProvider::new(&network.rpc_url)?);
        guard.insert(network.chain_id, provider.clone());
        log_info!(
            "初始化 RPC Provider: chain={} ({}) url={}",
            network.chain_id,
            network.name,
            network.rpc_url
        );
        if network.chain_id != chain_id {
            log_debug!("chain {} 未配置，使用默认网络 {}", chain_id, network.chain_id);
        }
        Ok(provider)
    }

    async fn shutdown(&self) {
        let mut guard = self.providers.write().await;
        let count = guard.len();
        guard.clear();
        log_info!("已释放 {} 个RPC Provider", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::network_config::{MAINNET_CHAIN_ID, SEPOLIA_CHAIN_ID};

    #[tokio::test]
    async fn providers_are_reused_per_resolved_chain() {
        let connector = ChainConnector::new(Arc::new(NetworkRegistry::default()));

        let a = connector.provider(MAINNET_CHAIN_ID).await.unwrap();
        let b = connector.provider(MAINNET_CHAIN_ID).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // 未知 id 与默认测试网共用
        let unknown = connector.provider(4242).await.unwrap();
        let sepolia = connector.provider(SEPOLIA_CHAIN_ID).await.unwrap();
        assert!(Arc::ptr_eq(&unknown, &sepolia));
        assert!(!Arc::ptr_eq(&a, &sepolia));
        assert_eq!(connector.providers.read().await.len(), 2);

        connector.shutdown().await;
        assert!(connector.providers.read().await.is_empty());
    }
}
