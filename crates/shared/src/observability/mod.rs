//! 可观测性
//!
//! 日志、分布式追踪和 Prometheus 指标的统一入口。
//! 服务进程在 main 中调用一次 [`init`]，持有返回的 guard 直到退出。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 追踪资源和启动计数器上的服务名
    pub service_name: String,

    /// OTLP 端点，为空时只输出本地日志
    pub otlp_endpoint: Option<String>,

    /// 追踪采样比例，取值 0.0 ~ 1.0
    pub trace_sample_ratio: f64,

    /// Prometheus 抓取端口，为空时不启动指标服务
    pub metrics_port: Option<u16>,

    /// 默认日志级别，RUST_LOG 优先
    pub log_level: String,

    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "mass-dispatch".to_string(),
            otlp_endpoint: None,
            trace_sample_ratio: 1.0,
            metrics_port: Some(9090),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }
}

/// 退出时关闭追踪导出并停止指标服务
pub struct ObservabilityGuard {
    _tracing: tracing::TracingGuard,
    _metrics: Option<metrics::MetricsHandle>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("可观测性组件关闭");
    }
}

/// 先装 tracing 再装指标，指标服务的启动日志才能被采集
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing_guard = tracing::init(config)?;

    let metrics_handle = match config.metrics_port {
        Some(port) => Some(metrics::init(&config.service_name, port).await?),
        None => None,
    };

    info!(
        service = %config.service_name,
        metrics_port = ?config.metrics_port,
        otlp_endpoint = ?config.otlp_endpoint,
        trace_sample_ratio = config.trace_sample_ratio,
        "可观测性初始化完成"
    );

    Ok(ObservabilityGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}
