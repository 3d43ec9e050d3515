//! 群发 API 处理器

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::{
    ApiResponse, BroadcastRequest, CancelResponse, OwnersDispatchRequest, PlatformDispatchRequest,
    ScheduleNotificationRequest, ScheduledIdResponse, ScheduledListQuery, StatsQuery,
    TemplatedDispatchRequest,
};
use super::state::AppState;
use crate::error::DispatchError;
use crate::models::{DispatchStatsRecord, DispatchSummary, ScheduledNotification, TypeDescriptor};
use crate::scheduler::DEFAULT_LIST_LIMIT;
use crate::stats::DEFAULT_RECENT_LIMIT;

type ApiResult<T> = Result<Json<ApiResponse<T>>, DispatchError>;

/// 推送给所有用户
///
/// POST /api/notifications/broadcast
pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> ApiResult<DispatchSummary> {
    req.validate()?;

    let summary = state
        .service
        .dispatch_to_all(req.title, req.body, req.payload, req.notification_type)
        .await?;

    Ok(Json(ApiResponse::success(summary)))
}

/// 推送给指定平台
///
/// POST /api/notifications/platform
pub async fn dispatch_platform(
    State(state): State<AppState>,
    Json(req): Json<PlatformDispatchRequest>,
) -> ApiResult<DispatchSummary> {
    req.validate()?;

    let summary = state
        .service
        .dispatch_to_platform(req.platform, req.title, req.body, req.payload)
        .await?;

    Ok(Json(ApiResponse::success(summary)))
}

/// 推送给指定用户
///
/// POST /api/notifications/owners
pub async fn dispatch_owners(
    State(state): State<AppState>,
    Json(req): Json<OwnersDispatchRequest>,
) -> ApiResult<DispatchSummary> {
    req.validate()?;

    let summary = state
        .service
        .dispatch_to_owners(req.owner_ids, req.title, req.body, req.payload)
        .await?;

    Ok(Json(ApiResponse::success(summary)))
}

/// 按类型模板推送
///
/// POST /api/notifications/templated
pub async fn dispatch_templated(
    State(state): State<AppState>,
    Json(req): Json<TemplatedDispatchRequest>,
) -> ApiResult<DispatchSummary> {
    req.validate()?;

    let summary = state
        .service
        .dispatch_templated(&req.notification_type, &req.params, req.audience)
        .await?;

    Ok(Json(ApiResponse::success(summary)))
}

/// 创建定时通知
///
/// POST /api/notifications/scheduled
pub async fn create_scheduled(
    State(state): State<AppState>,
    Json(req): Json<ScheduleNotificationRequest>,
) -> ApiResult<ScheduledIdResponse> {
    req.validate()?;

    let id = state
        .service
        .schedule(&req.to_request(), req.scheduled_at)
        .await?;

    info!(scheduled_id = %id, scheduled_at = %req.scheduled_at, "创建定时通知");
    Ok(Json(ApiResponse::success(ScheduledIdResponse { id })))
}

/// 定时通知列表
///
/// GET /api/notifications/scheduled?status=SCHEDULED&limit=50
pub async fn list_scheduled(
    State(state): State<AppState>,
    Query(query): Query<ScheduledListQuery>,
) -> ApiResult<Vec<ScheduledNotification>> {
    let records = state
        .service
        .list_scheduled(query.status, query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;

    Ok(Json(ApiResponse::success(records)))
}

/// 定时通知详情
///
/// GET /api/notifications/scheduled/{id}
pub async fn get_scheduled(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ScheduledNotification> {
    let record = state.service.get_scheduled(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// 取消定时通知
///
/// DELETE /api/notifications/scheduled/{id}
///
/// 已分发、已取消或不存在时返回 `cancelled: false`，不报错。
pub async fn cancel_scheduled(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CancelResponse> {
    let cancelled = state.service.cancel(id).await?;
    Ok(Json(ApiResponse::success(CancelResponse { cancelled })))
}

/// 最近的群发统计
///
/// GET /api/notifications/stats?limit=20
pub async fn recent_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Vec<DispatchStatsRecord>> {
    let records = state
        .service
        .recent_stats(query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
        .await?;

    Ok(Json(ApiResponse::success(records)))
}

/// 启用的通知类型
///
/// GET /api/notification-types
pub async fn list_types(State(state): State<AppState>) -> ApiResult<BTreeMap<String, TypeDescriptor>> {
    Ok(Json(ApiResponse::success(state.service.enabled_types())))
}
