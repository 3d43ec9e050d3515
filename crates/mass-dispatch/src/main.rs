//! 群发推送服务
//!
//! 提供群发、定时通知和统计查询的 REST API，并在后台触发到期的定时通知。

use std::sync::Arc;

use axum::{Json, Router, middleware, routing::get};
use mass_dispatch::{
    DispatchOptions, DispatchStores, HttpPushGateway, MassNotificationService, TypeRegistry,
    api::{self, AppState},
    repository::{EndpointRepository, ScheduledNotificationRepository, StatsRepository},
    worker::ScheduledDispatchWorker,
};
use push_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "mass-dispatch";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_default();

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        addr = %config.server_addr(),
        "{} 启动中",
        SERVICE_NAME
    );

    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;

    // 类型表只在启动时构建一次，变更需重新部署
    let registry = Arc::new(TypeRegistry::builtin().with_disabled(&config.dispatch.disabled_types));

    let stores = DispatchStores {
        endpoints: Arc::new(EndpointRepository::new(db.pool().clone())),
        stats: Arc::new(StatsRepository::new(db.pool().clone())),
        scheduled: Arc::new(ScheduledNotificationRepository::new(db.pool().clone())),
    };
    let gateway = Arc::new(HttpPushGateway::new(&config.gateway)?);
    let options = DispatchOptions::from(&config.dispatch);

    info!(
        batch_size = options.batch_size,
        batch_concurrency = options.batch_concurrency,
        recency_window_days = options.recency_window_days,
        max_retries = options.retry.max_retries,
        enabled_types = registry.enabled_keys().len(),
        "MassNotificationService initialized"
    );

    let service = Arc::new(MassNotificationService::new(
        registry, stores, gateway, options,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.scheduler.enabled {
        let worker = ScheduledDispatchWorker::new(service.clone(), &config.scheduler);
        Some(tokio::spawn(async move {
            worker.run(shutdown_rx).await;
        }))
    } else {
        info!("Scheduled dispatch worker disabled by configuration");
        None
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", api::api_routes())
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let db_for_ready = db.clone();
                move || readiness_check(db_for_ready.clone())
            }),
        )
        .layer(cors)
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(AppState::new(service));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 通知 Worker 退出；正在执行的一轮分发会跑完
    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库连接是否可用
async fn readiness_check(db: Database) -> Json<serde_json::Value> {
    let database = match db.ping().await {
        Ok(latency) => serde_json::json!({
            "status": "ok",
            "latencyMs": latency.as_millis() as u64
        }),
        Err(e) => {
            warn!(error = %e, "就绪检查：数据库不可用");
            serde_json::json!({ "status": "fail" })
        }
    };
    let ready = database["status"] == "ok";

    Json(serde_json::json!({
        "status": if ready { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": { "database": database }
    }))
}
