//! 群发服务错误类型
//!
//! 只有配置闸门（类型禁用/未知）和受众解析失败会让一次分发整体失败；
//! 单批网关失败与统计写入失败都不会以错误形式返回给调用方。

use push_shared::error::PushError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("通知类型已禁用: {key}")]
    TypeDisabled { key: String },

    #[error("未知的通知类型: {key}")]
    UnknownType { key: String },

    #[error("受众解析失败: {0}")]
    ResolutionFailed(String),

    #[error("定时通知不存在: {0}")]
    ScheduleNotFound(Uuid),

    #[error("无效的定时时间: {0}")]
    InvalidSchedule(String),

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error(transparent)]
    Shared(#[from] PushError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::TypeDisabled { .. } => "TYPE_DISABLED",
            Self::UnknownType { .. } => "UNKNOWN_TYPE",
            Self::ResolutionFailed(_) => "RESOLUTION_FAILED",
            Self::ScheduleNotFound(_) => "SCHEDULE_NOT_FOUND",
            Self::InvalidSchedule(_) => "INVALID_SCHEDULE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Shared(e) => e.code(),
        }
    }

    /// 是否为分发前的致命闸门错误（不会产生任何网络调用）
    pub fn is_gate_rejection(&self) -> bool {
        matches!(self, Self::TypeDisabled { .. } | Self::UnknownType { .. })
    }

    /// 存储层的瞬时故障，可按退避策略重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Shared(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DispatchError::TypeDisabled {
            key: "ORDER_CANCELLED".to_string(),
        };
        assert_eq!(err.to_string(), "通知类型已禁用: ORDER_CANCELLED");
        assert_eq!(err.code(), "TYPE_DISABLED");
        assert!(err.is_gate_rejection());

        let err = DispatchError::ResolutionFailed("连接池超时".to_string());
        assert_eq!(err.to_string(), "受众解析失败: 连接池超时");
        assert!(!err.is_gate_rejection());
    }

    #[test]
    fn test_shared_error_code_passthrough() {
        let err = DispatchError::from(PushError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(err.is_retryable());
        assert!(!DispatchError::ResolutionFailed("x".into()).is_retryable());
        assert!(!DispatchError::from(PushError::Database(sqlx::Error::PoolClosed)).is_retryable());
    }
}
