use crate::errors::error::AppError;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

pub const MAINNET_CHAIN_ID: u64 = 1;
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
pub const HOLESKY_CHAIN_ID: u64 = 17_000;

/// 单条网络配置，启动后不可变
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    /// 索引器 API 使用的 chainid 参数，缺省与 chain_id 相同
    #[serde(default)]
    pub indexer_chain_id: Option<u64>,
}

impl NetworkConfig {
    pub fn indexer_chain_id(&self) -> u64 {
        self.indexer_chain_id.unwrap_or(self.chain_id)
    }
}

/// 内置网络，配置文件中的同 id 条目会覆盖它们
fn builtin_networks() -> Vec<NetworkConfig> {
    vec![
        NetworkConfig {
            chain_id: MAINNET_CHAIN_ID,
            name: "Ethereum Mainnet".to_string(),
            rpc_url: "https://ethereum-rpc.publicnode.com".to_string(),
            indexer_chain_id: None,
        },
        NetworkConfig {
            chain_id: SEPOLIA_CHAIN_ID,
            name: "Sepolia Testnet".to_string(),
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            indexer_chain_id: None,
        },
        NetworkConfig {
            chain_id: HOLESKY_CHAIN_ID,
            name: "Holesky Testnet".to_string(),
            rpc_url: "https://ethereum-holesky-rpc.publicnode.com".to_string(),
            indexer_chain_id: None,
        },
    ]
}

/// chain id → 网络配置的只读查找表
///
/// 启动时构建一次，之后只读，可在任务间共享 `Arc<NetworkRegistry>`。
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: HashMap<u64, NetworkConfig>,
    default_network: NetworkConfig,
}

impl NetworkRegistry {
    pub fn new(configured: &[NetworkConfig], default_chain_id: u64) -> Result<Self, AppError> {
        let mut networks: HashMap<u64, NetworkConfig> = builtin_networks()
            .into_iter()
            .map(|n| (n.chain_id, n))
            .collect();

        for network in configured {
            Url::parse(&network.rpc_url).map_err(|e| {
                AppError::Config(format!(
                    "chain {} 的 rpc_url 无效 '{}': {}",
                    network.chain_id, network.rpc_url, e
                ))
            })?;
            networks.insert(network.chain_id, network.clone());
        }

        // 默认网络未配置时退回 Sepolia
        let default_network = networks
            .get(&default_chain_id)
            .or_else(|| networks.get(&SEPOLIA_CHAIN_ID))
            .cloned()
            .ok_or_else(|| AppError::Config("Sepolia 网络配置缺失".to_string()))?;

        Ok(Self {
            networks,
            default_network,
        })
    }

    /// 按 chain id 查找，未配置的 id 返回默认（测试网）配置
    pub fn get(&self, chain_id: u64) -> &NetworkConfig {
        self.networks
            .get(&chain_id)
            .unwrap_or(&self.default_network)
    }

    pub fn default_chain_id(&self) -> u64 {
        self.default_network.chain_id
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        let networks: HashMap<u64, NetworkConfig> = builtin_networks()
            .into_iter()
            .map(|n| (n.chain_id, n))
            .collect();
        let default_network = networks[&SEPOLIA_CHAIN_ID].clone();
        Self {
            networks,
            default_network,
        }
    }
}
