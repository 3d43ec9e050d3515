//! 请求与响应 DTO

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{AudienceSpec, NotificationRequest, Payload, Platform, ScheduleStatus};

/// 统一 API 响应格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }
}

/// 全量推送请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "内容长度必须在1-2000个字符之间"))]
    pub body: String,
    pub payload: Option<Payload>,
    pub notification_type: Option<String>,
}

/// 按平台推送请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDispatchRequest {
    pub platform: Platform,
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "内容长度必须在1-2000个字符之间"))]
    pub body: String,
    pub payload: Option<Payload>,
}

/// 指定用户推送请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OwnersDispatchRequest {
    #[validate(length(max = 10000, message = "单次最多指定10000个用户"))]
    pub owner_ids: Vec<String>,
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "内容长度必须在1-2000个字符之间"))]
    pub body: String,
    pub payload: Option<Payload>,
}

/// 模板推送请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedDispatchRequest {
    #[validate(length(min = 1, max = 64, message = "通知类型长度必须在1-64个字符之间"))]
    pub notification_type: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
    pub audience: AudienceSpec,
}

/// 创建定时通知请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleNotificationRequest {
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "内容长度必须在1-2000个字符之间"))]
    pub body: String,
    #[serde(default)]
    pub payload: Payload,
    pub audience: AudienceSpec,
    pub notification_type: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduleNotificationRequest {
    pub fn to_request(&self) -> NotificationRequest {
        NotificationRequest {
            title: self.title.clone(),
            body: self.body.clone(),
            payload: self.payload.clone(),
            audience: self.audience.clone(),
            notification_type: self.notification_type.clone(),
        }
    }
}

/// 定时通知列表查询
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledListQuery {
    pub status: Option<ScheduleStatus>,
    pub limit: Option<i64>,
}

/// 统计查询
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledIdResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub cancelled: bool,
}
