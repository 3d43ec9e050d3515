//! 受众解析
//!
//! 把受众规格翻译为一次端点存储查询。有效期过滤对三种受众一视同仁；
//! 空的自定义受众直接返回空集，不访问存储。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, instrument};

use crate::error::{DispatchError, Result};
use crate::models::{AudienceSpec, Endpoint};
use crate::repository::{EndpointQuery, EndpointStore};

pub struct AudienceResolver {
    store: Arc<dyn EndpointStore>,
    recency_window: Duration,
}

impl AudienceResolver {
    pub fn new(store: Arc<dyn EndpointStore>, recency_window_days: i64) -> Self {
        Self {
            store,
            recency_window: Duration::days(recency_window_days),
        }
    }

    /// 构建查询条件，空的自定义受众返回 None
    pub fn query_for(&self, audience: &AudienceSpec, now: DateTime<Utc>) -> Option<EndpointQuery> {
        let registered_after = now - self.recency_window;

        match audience {
            AudienceSpec::All => Some(EndpointQuery {
                platform: None,
                owner_ids: None,
                registered_after,
            }),
            AudienceSpec::Platform(platform) => Some(EndpointQuery {
                platform: Some(*platform),
                owner_ids: None,
                registered_after,
            }),
            AudienceSpec::Custom(ids) if ids.is_empty() => None,
            AudienceSpec::Custom(ids) => Some(EndpointQuery {
                platform: None,
                owner_ids: Some(ids.iter().cloned().collect()),
                registered_after,
            }),
        }
    }

    /// 解析受众
    ///
    /// 每次调用最多一次存储查询，不在内部重试；
    /// 存储失败时整体返回 ResolutionFailed，不使用部分结果。
    #[instrument(skip(self, audience), fields(audience = audience.tag()))]
    pub async fn resolve(&self, audience: &AudienceSpec) -> Result<Vec<Endpoint>> {
        let Some(query) = self.query_for(audience, Utc::now()) else {
            debug!("自定义受众为空，跳过端点查询");
            return Ok(Vec::new());
        };

        let endpoints = self.store.find_endpoints(&query).await.map_err(|e| {
            error!(error = %e, "查询推送端点失败");
            DispatchError::ResolutionFailed(e.to_string())
        })?;

        debug!(count = endpoints.len(), "受众解析完成");
        Ok(endpoints)
    }
}
