//! 数据库仓储层
//!
//! 端点存储、统计存储和定时通知存储的 trait 定义与 PostgreSQL 实现。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 状态迁移使用条件更新，保证取消与触发互斥且幂等
//! - 定义 trait 接口以支持 mock 测试和内存实现

mod endpoint_repo;
mod scheduled_repo;
mod stats_repo;
mod traits;

pub use endpoint_repo::EndpointRepository;
pub use scheduled_repo::ScheduledNotificationRepository;
pub use stats_repo::StatsRepository;
pub use traits::*;
