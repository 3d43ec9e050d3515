use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DispatchSummary, NotificationRequest};

/// 群发统计记录（只追加，不更新）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStatsRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub target_audience: String,
    pub notification_type: Option<String>,
    pub total_users: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub delivered_count: i64,
    pub opened_count: i64,
    pub created_at: DateTime<Utc>,
}

/// 待写入的统计行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDispatchStats {
    pub title: String,
    pub body: String,
    pub target_audience: String,
    pub notification_type: Option<String>,
    pub total_users: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
}

impl NewDispatchStats {
    pub fn new(request: &NotificationRequest, audience_tag: &str, summary: &DispatchSummary) -> Self {
        Self {
            title: request.title.clone(),
            body: request.body.clone(),
            target_audience: audience_tag.to_string(),
            notification_type: request.notification_type.clone(),
            total_users: summary.total_endpoints as i64,
            sent_count: summary.sent_count as i64,
            failed_count: summary.failed_count as i64,
            created_at: Utc::now(),
        }
    }
}
