//! 群发推送服务
//!
//! 把一条逻辑通知（标题、正文、业务数据、目标受众）扇出到大量设备推送端点：
//! 类型闸门 -> 受众解析 -> 按网关上限分批 -> 逐批发送 -> 汇总计数 -> 记录统计。
//! 单批失败只影响该批端点，调用方总能拿到一份完整的汇总。
//!
//! 定时通知先持久化，到期后由 [`worker::ScheduledDispatchWorker`] 触发同一条流水线。

pub mod aggregator;
pub mod api;
pub mod audience;
pub mod batcher;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod models;
pub mod registry;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod worker;

pub use error::{DispatchError, Result};
pub use gateway::{GatewayError, HttpPushGateway, PushGateway, PushMessage, PushTicket};
pub use registry::TypeRegistry;
pub use service::{DispatchOptions, DispatchStores, MassNotificationService};
