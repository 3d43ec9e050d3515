//! 群发服务
//!
//! 对外暴露的分发入口，按固定顺序串联各组件：
//!
//! 1. 类型闸门 -> 2. 受众解析 -> 3. 分批 -> 4. 逐批发送（可并发）
//!    -> 5. 汇总 -> 6. 统计记录（失败不影响结果） -> 7. 返回汇总
//!
//! 只有第 1、2 步会让调用整体失败；之后无论批次成败都返回一份汇总。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use push_shared::config::DispatchConfig;
use push_shared::observability::metrics;
use push_shared::retry::{RetryPolicy, retry_with_policy};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::aggregator;
use crate::audience::AudienceResolver;
use crate::batcher;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, Result};
use crate::gateway::PushGateway;
use crate::models::{
    AudienceSpec, BatchOutcome, DispatchStatsRecord, DispatchSummary, NotificationRequest,
    Payload, Platform, ScheduleStatus, ScheduledNotification, TypeDescriptor,
};
use crate::registry::TypeRegistry;
use crate::repository::{EndpointStore, ScheduledNotificationStore, StatsStore};
use crate::scheduler::Scheduler;
use crate::stats::StatsRecorder;

/// 分发参数
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub batch_size: usize,
    pub batch_concurrency: usize,
    pub recency_window_days: i64,
    pub retry: RetryPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchOptions {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            batch_size: config.effective_batch_size(),
            batch_concurrency: config.effective_concurrency(),
            recency_window_days: config.recency_window_days,
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

/// 群发服务依赖的外部存储
#[derive(Clone)]
pub struct DispatchStores {
    pub endpoints: Arc<dyn EndpointStore>,
    pub stats: Arc<dyn StatsStore>,
    pub scheduled: Arc<dyn ScheduledNotificationStore>,
}

/// 定时记录标记为已分发时的重试策略
fn mark_dispatched_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        multiplier: 2.0,
    }
}

/// 群发服务
pub struct MassNotificationService {
    registry: Arc<TypeRegistry>,
    resolver: AudienceResolver,
    dispatcher: Dispatcher,
    stats: StatsRecorder,
    scheduler: Scheduler,
    options: DispatchOptions,
    /// 已完成分发但未能落库为 Dispatched 的定时记录，本进程内不再触发
    unconfirmed: Mutex<HashSet<Uuid>>,
}

impl MassNotificationService {
    pub fn new(
        registry: Arc<TypeRegistry>,
        stores: DispatchStores,
        gateway: Arc<dyn PushGateway>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            registry,
            resolver: AudienceResolver::new(stores.endpoints, options.recency_window_days),
            dispatcher: Dispatcher::new(gateway, options.retry.clone()),
            stats: StatsRecorder::new(stores.stats),
            scheduler: Scheduler::new(stores.scheduled),
            options,
            unconfirmed: Mutex::new(HashSet::new()),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// 执行一次完整的分发流水线
    #[instrument(
        skip(self, request),
        fields(
            audience = request.audience.tag(),
            notification_type = request.notification_type.as_deref().unwrap_or("-")
        )
    )]
    pub async fn dispatch(&self, request: &NotificationRequest) -> Result<DispatchSummary> {
        let audience_tag = request.audience.tag();

        // 闸门必须先于任何存储或网关调用
        if let Some(key) = &request.notification_type {
            if let Err(e) = self.registry.check(key) {
                warn!(error = %e, "分发被类型闸门拒绝");
                metrics::record_dispatch_run(audience_tag, "rejected", 0.0);
                return Err(e);
            }
        }

        let started = Instant::now();

        let endpoints = match self.resolver.resolve(&request.audience).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                metrics::record_dispatch_run(
                    audience_tag,
                    "resolution_failed",
                    started.elapsed().as_secs_f64(),
                );
                return Err(e);
            }
        };

        let batches = batcher::chunk(endpoints, self.options.batch_size);
        let batch_count = batches.len();

        let outcomes: Vec<BatchOutcome> = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| async move {
                self.dispatcher.send(index, &batch, request).await
            })
            .buffer_unordered(self.options.batch_concurrency)
            .collect()
            .await;

        let summary = aggregator::fold(&outcomes);

        self.stats.record(request, audience_tag, &summary).await;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_dispatch_run(audience_tag, summary.status_label(), elapsed);
        metrics::record_endpoint_outcomes(summary.sent_count, summary.failed_count);

        info!(
            total_endpoints = summary.total_endpoints,
            sent_count = summary.sent_count,
            failed_count = summary.failed_count,
            batch_count,
            failed_batches = outcomes.iter().filter(|o| o.batch_failed).count(),
            elapsed_ms = (elapsed * 1000.0) as u64,
            "群发分发完成"
        );

        Ok(summary)
    }

    /// 推送给所有有效端点
    pub async fn dispatch_to_all(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: Option<Payload>,
        notification_type: Option<String>,
    ) -> Result<DispatchSummary> {
        let request = NotificationRequest {
            title: title.into(),
            body: body.into(),
            payload: payload.unwrap_or_default(),
            audience: AudienceSpec::All,
            notification_type,
        };
        self.dispatch(&request).await
    }

    /// 推送给指定平台的有效端点
    pub async fn dispatch_to_platform(
        &self,
        platform: Platform,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<DispatchSummary> {
        let request = NotificationRequest::new(title, body, AudienceSpec::Platform(platform))
            .with_payload(payload.unwrap_or_default());
        self.dispatch(&request).await
    }

    /// 推送给指定用户的有效端点，空列表直接返回全零汇总
    pub async fn dispatch_to_owners<I, S>(
        &self,
        owner_ids: I,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<DispatchSummary>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = NotificationRequest::new(title, body, AudienceSpec::custom(owner_ids))
            .with_payload(payload.unwrap_or_default());
        self.dispatch(&request).await
    }

    /// 按类型模板构建内容后分发，类型闸门同样生效
    pub async fn dispatch_templated(
        &self,
        type_key: &str,
        params: &HashMap<String, String>,
        audience: AudienceSpec,
    ) -> Result<DispatchSummary> {
        let rendered = self.registry.build_template(type_key, params)?;
        let request = NotificationRequest::new(rendered.title, rendered.body, audience)
            .with_payload(rendered.payload)
            .with_type(type_key);
        self.dispatch(&request).await
    }

    /// 创建定时通知
    ///
    /// 未注册的类型立即拒绝；禁用与否在触发时判断。
    pub async fn schedule(&self, request: &NotificationRequest, at: DateTime<Utc>) -> Result<Uuid> {
        if let Some(key) = &request.notification_type {
            if self.registry.get(key).is_none() {
                return Err(DispatchError::UnknownType { key: key.clone() });
            }
        }
        self.scheduler.schedule(request, at).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<bool> {
        self.scheduler.cancel(id).await
    }

    pub async fn get_scheduled(&self, id: Uuid) -> Result<ScheduledNotification> {
        self.scheduler.get(id).await
    }

    pub async fn list_scheduled(
        &self,
        status: Option<ScheduleStatus>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        self.scheduler.list(status, limit).await
    }

    pub async fn recent_stats(&self, limit: i64) -> Result<Vec<DispatchStatsRecord>> {
        self.stats.recent(limit).await
    }

    pub fn enabled_types(&self) -> BTreeMap<String, TypeDescriptor> {
        self.registry.enabled_types()
    }

    /// 到期且类型可用的定时记录
    pub async fn due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        let enabled = self.registry.enabled_keys();
        self.scheduler.due(now, &enabled, limit).await
    }

    /// 触发一条定时记录
    ///
    /// 发送前重新读取状态，已取消或已分发的记录返回 `Ok(None)`。
    /// 流水线返回汇总（含部分失败）后标记为 Dispatched，标记失败只记录日志，
    /// 该记录在本进程内不会再次触发。
    /// 闸门拒绝或受众解析失败时记录保持 Scheduled，错误原样返回。
    #[instrument(skip(self, record), fields(scheduled_id = %record.id))]
    pub async fn trigger_scheduled(
        &self,
        record: &ScheduledNotification,
    ) -> Result<Option<DispatchSummary>> {
        if self.unconfirmed.lock().await.contains(&record.id) {
            warn!("定时通知已分发但状态未落库，跳过");
            return Ok(None);
        }

        let current = self.scheduler.get(record.id).await?;
        if current.status.is_terminal() {
            info!(status = ?current.status, "定时通知已不在待触发状态，跳过");
            return Ok(None);
        }

        let summary = self.dispatch(&current.to_request()).await?;

        let marked = retry_with_policy(
            &mark_dispatched_policy(),
            "mark_scheduled_dispatched",
            |e: &DispatchError| e.is_retryable(),
            || self.scheduler.mark_dispatched(current.id),
        )
        .await;

        match marked {
            Ok(true) => {}
            Ok(false) => warn!("定时通知在分发期间状态已变化，未标记为已分发"),
            Err(e) => {
                error!(error = %e, "定时通知已分发，但标记为已分发失败");
                self.unconfirmed.lock().await.insert(current.id);
            }
        }

        Ok(Some(summary))
    }
}
