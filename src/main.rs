use anyhow::Context;
use eth_wallet_cache::config::Config;
use eth_wallet_cache::log_info;
use eth_wallet_cache::startup::Application;
use eth_wallet_cache::utils::logger::init_logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志（全局只需调用一次）
    init_logger();

    log_info!("Starting application initialization...");

    // 1. 加载配置
    let config = Config::load().context("Failed to load application configuration")?;

    // 2. 构建应用实例 (初始化资源)
    let application = Application::build(config)
        .await
        .context("Application building failed (DB/Redis initialization)")?;

    log_info!("Application build complete. Starting refresh loop.");

    // 3. 运行直到收到退出信号
    application
        .run()
        .await
        .context("Application core service failed during runtime")?;

    Ok(())
}
