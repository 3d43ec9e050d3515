//! Prometheus 指标
//!
//! 业务代码通过下面的 `record_*` 函数打点，未安装 recorder 时这些调用为空操作，
//! 因此单元测试无需初始化。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 覆盖单条 HTTP 请求到整次群发（分钟级）的耗时范围
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0,
];

/// 指标服务任务，drop 时停止监听
pub struct MetricsHandle {
    server: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// 安装全局 recorder，并在独立端口上暴露 `/metrics`
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server })
}

/// 注册通用指标描述（出现在 /metrics 的 HELP 注释中）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "mass_dispatch_runs_total",
        "Total number of mass notification dispatch runs"
    );
    metrics::describe_histogram!(
        "mass_dispatch_duration_seconds",
        "Mass notification dispatch duration in seconds"
    );

    metrics::describe_counter!(
        "push_gateway_batches_total",
        "Total number of batches sent to the push gateway"
    );
    metrics::describe_histogram!(
        "push_gateway_batch_duration_seconds",
        "Push gateway call duration in seconds"
    );

    metrics::describe_counter!(
        "push_endpoints_total",
        "Total number of push endpoints by delivery outcome"
    );

    metrics::describe_counter!(
        "scheduled_notifications_total",
        "Scheduled notification lifecycle actions"
    );

    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last background worker iteration"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "指标服务已启动");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "指标服务异常退出");
        }
    }))
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次群发分发
#[inline]
pub fn record_dispatch_run(audience: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "mass_dispatch_runs_total",
        "audience" => audience.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "mass_dispatch_duration_seconds",
        "audience" => audience.to_string()
    )
    .record(duration_secs);
}

/// 记录一次网关批次调用
#[inline]
pub fn record_gateway_batch(status: &str, size: usize, duration_secs: f64) {
    metrics::counter!(
        "push_gateway_batches_total",
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("push_gateway_batch_size").record(size as f64);
    metrics::histogram!(
        "push_gateway_batch_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration_secs);
}

/// 记录端点投递结果
#[inline]
pub fn record_endpoint_outcomes(sent: u64, failed: u64) {
    metrics::counter!("push_endpoints_total", "outcome" => "sent").increment(sent);
    metrics::counter!("push_endpoints_total", "outcome" => "failed").increment(failed);
}

/// 记录定时通知生命周期动作（scheduled / cancelled / dispatched）
#[inline]
pub fn record_scheduled_action(action: &str) {
    metrics::counter!(
        "scheduled_notifications_total",
        "action" => action.to_string()
    )
    .increment(1);
}

/// 记录后台 Worker 最近一次运行时间，供告警判断 Worker 是否存活
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!(
        "worker_last_run_timestamp",
        "worker" => worker.to_string()
    )
    .set(chrono::Utc::now().timestamp() as f64);
}
