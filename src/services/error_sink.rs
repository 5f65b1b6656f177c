use crate::errors::error::AppError;
use std::fmt;

/// 被吞掉的失败发生在哪个环节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// 获取收据失败
    Receipt,
    /// 代币元数据解析失败
    TokenMetadata,
    /// 代币元数据缓存读写失败
    TokenCache,
    /// 交易写缓存失败
    CacheWrite,
    /// 钱包写缓存失败
    WalletWrite,
    /// 缓存读取失败（降级为缓存未命中）
    CacheRead,
    /// 前台同步失败
    Sync,
    /// 后台同步失败
    BackgroundSync,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Receipt => "receipt",
            FailureStage::TokenMetadata => "token_metadata",
            FailureStage::TokenCache => "token_cache",
            FailureStage::CacheWrite => "cache_write",
            FailureStage::WalletWrite => "wallet_write",
            FailureStage::CacheRead => "cache_read",
            FailureStage::Sync => "sync",
            FailureStage::BackgroundSync => "background_sync",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 不向调用方暴露、但运维需要看到的失败
///
/// 补全与缓存写入的错误都会被吞掉，每个吞掉的位置都要经过这里上报。
pub trait ErrorSink: Send + Sync {
    fn report(&self, stage: FailureStage, context: &str, error: &AppError);
}

/// 默认实现：输出结构化 warn 事件
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, stage: FailureStage, context: &str, error: &AppError) {
        tracing::warn!(
            stage = stage.as_str(),
            context = context,
            error = %error,
            "swallowed failure"
        );
    }
}
