use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wordflow::{config::Config, routes, services::Database, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting WordFlow service ({})...", config.environment);

    // 初始化数据库连接
    let db = match Database::new(&config).await {
        Ok(db) => {
            db.verify_connection().await?;
            Arc::new(db)
        }
        Err(e) => {
            error!("Failed to create database connection: {}", e);
            return Err(anyhow::anyhow!("Database initialization failed: {}", e));
        }
    };

    // 创建应用状态
    let app_state = Arc::new(AppState::new(config.clone(), db).await?);

    // 补发上次进程退出前未分发的事件
    if config.replay_outbox_on_startup {
        match app_state.trigger_service.replay_pending().await {
            Ok(0) => {}
            Ok(count) => info!("Replayed {} pending outbox events", count),
            Err(e) => error!("Failed to replay outbox events: {}", e),
        }
    }

    // 定期清理已分发的事件
    {
        let triggers = app_state.trigger_service.clone();
        let retention = chrono::Duration::hours(config.outbox_retention_hours.max(0));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                if let Err(e) = triggers.prune_dispatched(retention).await {
                    error!("Failed to prune outbox events: {}", e);
                }
            }
        });
    }

    let app = routes::create_app(app_state);

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
