use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 设备平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(format!("不支持的平台: {other}")),
        }
    }
}

/// 设备推送端点
///
/// 由端点存储维护，群发引擎只读。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// 推送令牌（对引擎不透明）
    pub token: String,
    pub platform: Platform,
    pub owner_id: String,
    pub registered_at: DateTime<Utc>,
}

impl Endpoint {
    pub fn new(
        token: impl Into<String>,
        platform: Platform,
        owner_id: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            platform,
            owner_id: owner_id.into(),
            registered_at,
        }
    }

    /// 注册时间是否不早于截止时间
    pub fn is_eligible(&self, cutoff: DateTime<Utc>) -> bool {
        self.registered_at >= cutoff
    }
}
