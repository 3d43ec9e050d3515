//! 群发领域模型
//!
//! 分发请求、设备端点、投递结果、统计记录和定时记录。
//! 所有模型都支持 JSON（serde）序列化，落库的枚举同时支持 sqlx。

mod endpoint;
mod notification_type;
mod outcome;
mod request;
mod scheduled;
mod stats;

pub use endpoint::{Endpoint, Platform};
pub use notification_type::{NotificationTemplate, RenderedTemplate, TypeDescriptor};
pub use outcome::{BatchOutcome, DeliveryOutcome, DispatchSummary};
pub use request::{AudienceSpec, NotificationRequest, Payload};
pub use scheduled::{ScheduleStatus, ScheduledNotification};
pub use stats::{DispatchStatsRecord, NewDispatchStats};
