use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AudienceSpec, NotificationRequest, Payload};

/// 定时通知状态
///
/// 只允许 Scheduled -> Dispatched 与 Scheduled -> Cancelled 两种迁移，
/// Dispatched 和 Cancelled 为终态。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Scheduled,
    Dispatched,
    Cancelled,
}

impl ScheduleStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

/// 定时通知记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub payload: Payload,
    pub audience: AudienceSpec,
    pub notification_type: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
}

impl ScheduledNotification {
    /// 由请求创建一条待触发记录
    pub fn from_request(request: &NotificationRequest, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: request.title.clone(),
            body: request.body.clone(),
            payload: request.payload.clone(),
            audience: request.audience.clone(),
            notification_type: request.notification_type.clone(),
            scheduled_at,
            status: ScheduleStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    /// 还原为分发请求，供触发器调用分发流水线
    pub fn to_request(&self) -> NotificationRequest {
        NotificationRequest {
            title: self.title.clone(),
            body: self.body.clone(),
            payload: self.payload.clone(),
            audience: self.audience.clone(),
            notification_type: self.notification_type.clone(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Scheduled && self.scheduled_at <= now
    }
}
