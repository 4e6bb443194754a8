//! Flash server entry point
//!
//! 启动流程: 加载环境变量 -> 初始化日志 -> 构建组件 -> 启动后台任务
//! -> 等待 Ctrl+C -> 优雅关闭。

use flash_server::core::{init_logger, BackgroundTasks};
use flash_server::{Config, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let json_logs = config.environment == "production";
    init_logger("info", json_logs)?;

    tracing::info!(environment = %config.environment, "Starting flash server");

    let state = ServerState::new(config);
    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks);
    tracing::info!(count = tasks.len(), "Background tasks started");

    // An event logger keeps the bus drained in lieu of a dispatcher
    let mut events = state.events.subscribe();
    let token = tasks.shutdown_token();
    tasks.spawn(
        "event_logger",
        flash_server::core::TaskKind::Worker,
        async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => tracing::info!(event = %event, "Domain event"),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "Event logger lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        },
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    tracing::info!("Flash server stopped");
    Ok(())
}
