//! 基础设施错误
//!
//! 只覆盖存储和网关客户端这类与业务无关的失败，
//! 分发语义上的错误（类型禁用、受众解析失败等）由服务 crate 自行定义。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("存储访问失败: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("推送网关客户端初始化失败: {0}")]
    GatewayClient(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PushError>;

impl PushError {
    /// 错误码，写入 API 响应体
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::GatewayClient(_) => "GATEWAY_CLIENT_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 连接池耗尽或网络抖动，稍后重试可能成功
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        )
    }
}
