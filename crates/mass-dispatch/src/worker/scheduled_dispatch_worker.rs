//! 定时通知触发 Worker
//!
//! 轮询到期的 Scheduled 记录，逐条执行分发流水线，流水线返回汇总后标记为 Dispatched。
//!
//! - 已取消、已分发的记录不会被选中，发送前还会重新读取一次状态
//! - 类型被禁用或未注册的记录不会被选中，保持 Scheduled 直到类型恢复或被人工取消
//! - 受众解析失败的记录保持 Scheduled，下一轮继续尝试
//! - 已分发但标记失败的记录由服务在本进程内记住，不会重复发送
//!
//! 部署上假设只有一个触发实例。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use push_shared::config::SchedulerConfig;
use push_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::service::MassNotificationService;

const WORKER_NAME: &str = "scheduled_dispatch_worker";

/// 单轮触发结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TriggerReport {
    pub due: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct ScheduledDispatchWorker {
    service: Arc<MassNotificationService>,
    poll_interval: Duration,
    due_batch_limit: i64,
}

impl ScheduledDispatchWorker {
    pub fn new(service: Arc<MassNotificationService>, config: &SchedulerConfig) -> Self {
        Self {
            service,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            due_batch_limit: config.due_batch_limit.max(1),
        }
    }

    /// 主循环：直到收到关闭信号
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval = ?self.poll_interval,
            due_batch_limit = self.due_batch_limit,
            "ScheduledDispatchWorker 已启动"
        );

        loop {
            if let Err(e) = self.run_once(Utc::now()).await {
                error!(error = %e, "定时通知轮询出错");
            }

            metrics::set_worker_last_run(WORKER_NAME);

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    info!("ScheduledDispatchWorker 收到关闭信号，退出");
                    return;
                }
            }
        }
    }

    /// 处理一轮到期记录
    ///
    /// 单条记录失败不影响同一轮的其他记录。
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<TriggerReport> {
        let due = self.service.due_scheduled(now, self.due_batch_limit).await?;
        let mut report = TriggerReport {
            due: due.len(),
            ..TriggerReport::default()
        };

        if due.is_empty() {
            return Ok(report);
        }

        info!(count = due.len(), "发现到期的定时通知");

        for record in &due {
            match self.service.trigger_scheduled(record).await {
                Ok(Some(summary)) => {
                    report.dispatched += 1;
                    info!(
                        scheduled_id = %record.id,
                        total_endpoints = summary.total_endpoints,
                        sent_count = summary.sent_count,
                        failed_count = summary.failed_count,
                        "定时通知已分发"
                    );
                }
                Ok(None) => report.skipped += 1,
                Err(e) if e.is_gate_rejection() => {
                    report.failed += 1;
                    info!(
                        scheduled_id = %record.id,
                        error = %e,
                        "定时通知类型不可用，保持待触发状态"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        scheduled_id = %record.id,
                        error = %e,
                        "定时通知分发失败，保持待触发状态"
                    );
                }
            }
        }

        Ok(report)
    }
}
