//! 推送网关客户端
//!
//! 一次调用携带不超过 100 条消息，响应按位置与请求一一对应。
//! `PushGateway` trait 隔离具体传输，便于在测试中替换。

mod http;

pub use http::HttpPushGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Payload;

/// 单条推送消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: Payload,
    pub sound: String,
    pub badge: u32,
}

/// 网关对单条消息的回执
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTicket {
    /// "ok" 或错误码
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PushTicket {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
            details: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: code.into(),
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// 拒绝原因：优先取 details.error，其次 message，最后是状态码本身
    pub fn rejection_reason(&self) -> String {
        self.details
            .as_ref()
            .and_then(|d| d.get("error"))
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| self.status.clone())
    }
}

/// 网关调用失败
///
/// 任何一种都意味着整批端点的结果不可知，按传输失败处理。
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("网关传输失败: {0}")]
    Transport(String),

    #[error("网关调用超时 ({0}ms)")]
    Timeout(u64),

    #[error("网关返回异常状态 {status}: {body}")]
    Status { status: u16, body: String },

    #[error("网关响应无法解析: {0}")]
    MalformedResponse(String),

    #[error("网关回执数量不匹配: 期望 {expected}，实际 {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl GatewayError {
    /// 是否值得重试（网络层故障、超时、5xx 和限流）
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::MalformedResponse(_) | Self::LengthMismatch { .. } => false,
        }
    }

    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_failure",
            Self::Timeout(_) => "timeout",
            Self::Status { .. } => "http_status",
            Self::MalformedResponse(_) => "malformed",
            Self::LengthMismatch { .. } => "length_mismatch",
        }
    }
}

/// 推送网关接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// 发送一批消息，返回与输入按位置对齐的回执
    async fn send_batch(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_precedence() {
        let ticket: PushTicket = serde_json::from_value(serde_json::json!({
            "status": "error",
            "message": "\"ExponentPushToken[xxx]\" is not a registered push notification recipient",
            "details": { "error": "DeviceNotRegistered" }
        }))
        .unwrap();
        assert!(!ticket.is_ok());
        assert_eq!(ticket.rejection_reason(), "DeviceNotRegistered");

        let ticket = PushTicket::error("error", "MessageTooBig");
        assert_eq!(ticket.rejection_reason(), "MessageTooBig");

        let ticket = PushTicket {
            status: "InvalidCredentials".to_string(),
            message: None,
            details: None,
        };
        assert_eq!(ticket.rejection_reason(), "InvalidCredentials");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(GatewayError::Timeout(1000).is_retryable());
        assert!(GatewayError::Transport("connection reset".into()).is_retryable());
        assert!(
            GatewayError::Status {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            GatewayError::Status {
                status: 429,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !GatewayError::Status {
                status: 400,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!GatewayError::MalformedResponse("eof".into()).is_retryable());
        assert!(
            !GatewayError::LengthMismatch {
                expected: 100,
                actual: 99
            }
            .is_retryable()
        );
    }
}
