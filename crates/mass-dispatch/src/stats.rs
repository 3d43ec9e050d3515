//! 统计记录
//!
//! 写入失败只记录日志：推送已经发出，不能因为统计丢失而让分发失败。

use std::sync::Arc;

use tracing::{error, info};

use crate::error::Result;
use crate::models::{DispatchStatsRecord, DispatchSummary, NewDispatchStats, NotificationRequest};
use crate::repository::StatsStore;

/// 查询最近统计的默认条数
pub const DEFAULT_RECENT_LIMIT: i64 = 20;

/// 查询最近统计的最大条数
pub const MAX_RECENT_LIMIT: i64 = 100;

pub struct StatsRecorder {
    store: Arc<dyn StatsStore>,
}

impl StatsRecorder {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        request: &NotificationRequest,
        audience_tag: &str,
        summary: &DispatchSummary,
    ) {
        let stats = NewDispatchStats::new(request, audience_tag, summary);

        match self.store.insert_stats(&stats).await {
            Ok(id) => info!(stats_id = id, target_audience = audience_tag, "群发统计已记录"),
            Err(e) => error!(
                error = %e,
                target_audience = audience_tag,
                total_endpoints = summary.total_endpoints,
                sent_count = summary.sent_count,
                failed_count = summary.failed_count,
                "群发统计写入失败"
            ),
        }
    }

    /// 最近 N 条统计，N 限定在 1..=MAX_RECENT_LIMIT
    pub async fn recent(&self, limit: i64) -> Result<Vec<DispatchStatsRecord>> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        Ok(self.store.list_recent(limit).await?)
    }
}
