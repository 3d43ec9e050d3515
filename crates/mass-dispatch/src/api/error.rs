//! 错误到 HTTP 响应的映射

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::dto::ApiResponse;
use crate::error::DispatchError;

impl DispatchError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TypeDisabled { .. } => StatusCode::CONFLICT,
            Self::UnknownType { .. } | Self::ScheduleNotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
            Self::ResolutionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 基础设施错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::ResolutionFailed(e) => {
                tracing::error!(error = %e, "受众解析失败");
                "推送端点暂时不可用，请稍后重试".to_string()
            }
            Self::Shared(e) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        (status, axum::Json(ApiResponse::<()>::error(self.code(), message))).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for DispatchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
