use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Payload;

/// 通知类型描述（静态配置，运行时只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    pub key: String,
    pub enabled: bool,
    pub title: String,
    pub icon: String,
    pub sound: bool,
    pub vibration: bool,
    #[serde(skip)]
    pub template: Option<NotificationTemplate>,
}

/// 通知模板，支持 `{{variable}}` 占位符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub title: String,
    pub body: String,
}

impl NotificationTemplate {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// 模板渲染结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTemplate {
    pub title: String,
    pub body: String,
    pub payload: Payload,
}

impl RenderedTemplate {
    /// 以类型和模板参数组装 payload
    pub fn payload_from(key: &str, params: &HashMap<String, String>) -> Payload {
        let mut payload: Payload = params
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        payload.insert("type".to_string(), serde_json::Value::String(key.to_string()));
        payload
    }
}
