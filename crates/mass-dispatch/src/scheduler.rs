//! 定时通知
//!
//! 只负责持久化与状态迁移；到期触发由 `worker::ScheduledDispatchWorker` 完成。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use push_shared::observability::metrics;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::models::{NotificationRequest, ScheduleStatus, ScheduledNotification};
use crate::repository::ScheduledNotificationStore;

pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// 列表查询的最大条数
pub const MAX_LIST_LIMIT: i64 = 200;

pub struct Scheduler {
    store: Arc<dyn ScheduledNotificationStore>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ScheduledNotificationStore>) -> Self {
        Self { store }
    }

    /// 创建定时记录，计划时间必须晚于当前时间
    #[instrument(skip(self, request), fields(scheduled_at = %at))]
    pub async fn schedule(&self, request: &NotificationRequest, at: DateTime<Utc>) -> Result<Uuid> {
        if at <= Utc::now() {
            return Err(DispatchError::InvalidSchedule(format!(
                "计划时间 {at} 不晚于当前时间"
            )));
        }

        let record = ScheduledNotification::from_request(request, at);
        self.store.create(&record).await?;

        metrics::record_scheduled_action("scheduled");
        info!(scheduled_id = %record.id, audience = record.audience.tag(), "定时通知已创建");
        Ok(record.id)
    }

    /// 取消定时记录
    ///
    /// 仅当记录仍为 Scheduled 时返回 true；已终态或不存在返回 false，不报错。
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid) -> Result<bool> {
        let cancelled = self.store.cancel(id).await?;

        if cancelled {
            metrics::record_scheduled_action("cancelled");
            info!(scheduled_id = %id, "定时通知已取消");
        }
        Ok(cancelled)
    }

    pub async fn get(&self, id: Uuid) -> Result<ScheduledNotification> {
        self.store
            .get(id)
            .await?
            .ok_or(DispatchError::ScheduleNotFound(id))
    }

    pub async fn list(
        &self,
        status: Option<ScheduleStatus>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        Ok(self
            .store
            .list(status, limit.clamp(1, MAX_LIST_LIMIT))
            .await?)
    }

    /// 到期待触发的记录
    pub async fn due(
        &self,
        now: DateTime<Utc>,
        enabled_types: &[String],
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        Ok(self.store.list_due(now, enabled_types, limit.max(1)).await?)
    }

    /// 分发流水线返回汇总后调用，只有仍为 Scheduled 的记录会迁移
    pub async fn mark_dispatched(&self, id: Uuid) -> Result<bool> {
        let marked = self.store.mark_dispatched(id).await?;

        if marked {
            metrics::record_scheduled_action("dispatched");
        }
        Ok(marked)
    }
}
