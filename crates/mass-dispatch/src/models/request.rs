use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::Platform;

/// 通知携带的业务数据（对引擎不透明）
pub type Payload = HashMap<String, serde_json::Value>;

/// 受众规格
///
/// JSON 形式：`{"type":"all"}`、`{"type":"platform","value":"ios"}`、
/// `{"type":"custom","value":["user-1","user-2"]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AudienceSpec {
    /// 所有有效端点
    All,
    /// 指定平台的有效端点
    Platform(Platform),
    /// 指定用户的有效端点
    Custom(BTreeSet<String>),
}

impl AudienceSpec {
    pub fn custom<I, S>(owner_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Custom(owner_ids.into_iter().map(Into::into).collect())
    }

    /// 写入统计记录的受众标签
    pub fn tag(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Platform(platform) => platform.as_str(),
            Self::Custom(_) => "custom",
        }
    }
}

/// 群发请求
///
/// 一次分发流水线的工作单元，构造完成后按引用传递，不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub payload: Payload,
    pub audience: AudienceSpec,
    /// 通知类型，指定时须在类型注册表中启用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>, audience: AudienceSpec) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            payload: Payload::new(),
            audience,
            notification_type: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn with_type(mut self, notification_type: impl Into<String>) -> Self {
        self.notification_type = Some(notification_type.into());
        self
    }
}
