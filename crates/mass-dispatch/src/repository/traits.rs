//! 仓储 Trait 定义
//!
//! 分发引擎只依赖这些接口，具体存储可替换为 PostgreSQL 实现、mock 或内存实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use push_shared::error::Result;
use uuid::Uuid;

use crate::models::{
    DispatchStatsRecord, Endpoint, NewDispatchStats, Platform, ScheduleStatus,
    ScheduledNotification,
};

/// 端点查询条件
///
/// 三个条件同时作用于一次查询；`registered_after` 总是生效。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointQuery {
    pub platform: Option<Platform>,
    pub owner_ids: Option<Vec<String>>,
    pub registered_after: DateTime<Utc>,
}

impl EndpointQuery {
    pub fn matches(&self, endpoint: &Endpoint) -> bool {
        endpoint.is_eligible(self.registered_after)
            && self.platform.is_none_or(|p| endpoint.platform == p)
            && self
                .owner_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&endpoint.owner_id))
    }
}

/// 端点存储接口（只读）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EndpointStore: Send + Sync {
    /// 按条件查询端点，按注册时间、令牌排序
    async fn find_endpoints(&self, query: &EndpointQuery) -> Result<Vec<Endpoint>>;
}

/// 统计存储接口（追加写入）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn insert_stats(&self, stats: &NewDispatchStats) -> Result<i64>;
    /// 最近 N 条，按创建时间倒序
    async fn list_recent(&self, limit: i64) -> Result<Vec<DispatchStatsRecord>>;
}

/// 定时通知存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduledNotificationStore: Send + Sync {
    async fn create(&self, record: &ScheduledNotification) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<ScheduledNotification>>;
    async fn list(
        &self,
        status: Option<ScheduleStatus>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>>;
    /// 到期且仍为 Scheduled 的记录，类型为空或属于 `enabled_types`，按计划时间升序
    async fn list_due(
        &self,
        now: DateTime<Utc>,
        enabled_types: &[String],
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>>;
    /// Scheduled -> Cancelled，返回是否发生了迁移
    async fn cancel(&self, id: Uuid) -> Result<bool>;
    /// Scheduled -> Dispatched，返回是否发生了迁移
    async fn mark_dispatched(&self, id: Uuid) -> Result<bool>;
}
