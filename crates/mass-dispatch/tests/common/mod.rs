//! 集成测试公共设施
//!
//! 以内存实现替代 PostgreSQL 与推送网关，记录调用次数供断言使用。

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mass_dispatch::gateway::{GatewayError, PushGateway, PushMessage, PushTicket};
use mass_dispatch::models::{
    DispatchStatsRecord, Endpoint, NewDispatchStats, Platform, ScheduleStatus,
    ScheduledNotification,
};
use mass_dispatch::repository::{
    EndpointQuery, EndpointStore, ScheduledNotificationStore, StatsStore,
};
use mass_dispatch::{DispatchOptions, DispatchStores, MassNotificationService, TypeRegistry};
use push_shared::error::{PushError, Result};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// 端点存储
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryEndpointStore {
    endpoints: Vec<Endpoint>,
    pub queries: AtomicUsize,
    pub fail: AtomicBool,
}

impl InMemoryEndpointStore {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints,
            ..Self::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointStore for InMemoryEndpointStore {
    async fn find_endpoints(&self, query: &EndpointQuery) -> Result<Vec<Endpoint>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut found: Vec<_> = self
            .endpoints
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.token.cmp(&b.token))
        });
        Ok(found)
    }
}

/// 生成 n 个近期注册的端点，平台交替
pub fn fresh_endpoints(n: usize) -> Vec<Endpoint> {
    let base = Utc::now() - Duration::days(1);
    (0..n)
        .map(|i| {
            let platform = if i % 2 == 0 {
                Platform::Ios
            } else {
                Platform::Android
            };
            Endpoint::new(
                format!("ExponentPushToken[{i:05}]"),
                platform,
                format!("user-{i}"),
                base + Duration::seconds(i as i64),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 推送网关
// ---------------------------------------------------------------------------

/// 按调用序号编排行为的网关
#[derive(Default)]
pub struct ScriptedGateway {
    /// 每次调用的消息数
    calls: Mutex<Vec<usize>>,
    /// 超时的调用序号（从 1 开始）
    timeout_calls: HashSet<usize>,
    /// 被拒收的令牌
    rejected_tokens: HashSet<String>,
}

impl ScriptedGateway {
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn timeout_on(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            timeout_calls: calls.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn rejecting(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            rejected_tokens: tokens.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PushGateway for ScriptedGateway {
    async fn send_batch(
        &self,
        messages: &[PushMessage],
    ) -> std::result::Result<Vec<PushTicket>, GatewayError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(messages.len());
            calls.len()
        };

        if self.timeout_calls.contains(&call_number) {
            return Err(GatewayError::Timeout(10_000));
        }

        Ok(messages
            .iter()
            .map(|m| {
                if self.rejected_tokens.contains(&m.to) {
                    PushTicket::error("error", "DeviceNotRegistered")
                } else {
                    PushTicket::ok()
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// 统计存储
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryStatsStore {
    rows: Mutex<Vec<DispatchStatsRecord>>,
    pub fail: AtomicBool,
}

impl InMemoryStatsStore {
    pub fn rows(&self) -> Vec<DispatchStatsRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn insert_stats(&self, stats: &NewDispatchStats) -> Result<i64> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::Database(sqlx::Error::PoolClosed));
        }

        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(DispatchStatsRecord {
            id,
            title: stats.title.clone(),
            body: stats.body.clone(),
            target_audience: stats.target_audience.clone(),
            notification_type: stats.notification_type.clone(),
            total_users: stats.total_users,
            sent_count: stats.sent_count,
            failed_count: stats.failed_count,
            delivered_count: 0,
            opened_count: 0,
            created_at: stats.created_at,
        });
        Ok(id)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<DispatchStatsRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().rev().take(limit as usize).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// 定时通知存储
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryScheduledStore {
    records: Mutex<HashMap<Uuid, ScheduledNotification>>,
    pub fail_mark: AtomicBool,
}

impl InMemoryScheduledStore {
    pub fn status_of(&self, id: Uuid) -> Option<ScheduleStatus> {
        self.records.lock().unwrap().get(&id).map(|r| r.status)
    }

    /// 直接插入记录（绕过计划时间校验，用于构造已到期数据）
    pub fn insert(&self, record: ScheduledNotification) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    fn transition(&self, id: Uuid, to: ScheduleStatus) -> bool {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(record) if record.status == ScheduleStatus::Scheduled => {
                record.status = to;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ScheduledNotificationStore for InMemoryScheduledStore {
    async fn create(&self, record: &ScheduledNotification) -> Result<()> {
        self.insert(record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledNotification>> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn list(
        &self,
        status: Option<ScheduleStatus>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        let records = self.records.lock().unwrap();
        let mut list: Vec<_> = records
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        list.truncate(limit as usize);
        Ok(list)
    }

    async fn list_due(
        &self,
        now: DateTime<Utc>,
        enabled_types: &[String],
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        let records = self.records.lock().unwrap();
        let mut due: Vec<_> = records
            .values()
            .filter(|r| r.is_due(now))
            .filter(|r| {
                r.notification_type
                    .as_ref()
                    .is_none_or(|t| enabled_types.contains(t))
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn cancel(&self, id: Uuid) -> Result<bool> {
        Ok(self.transition(id, ScheduleStatus::Cancelled))
    }

    async fn mark_dispatched(&self, id: Uuid) -> Result<bool> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(PushError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.transition(id, ScheduleStatus::Dispatched))
    }
}

// ---------------------------------------------------------------------------
// 组装
// ---------------------------------------------------------------------------

pub struct Harness {
    pub service: Arc<MassNotificationService>,
    pub endpoints: Arc<InMemoryEndpointStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub stats: Arc<InMemoryStatsStore>,
    pub scheduled: Arc<InMemoryScheduledStore>,
}

impl Harness {
    pub fn new(endpoints: Vec<Endpoint>, gateway: ScriptedGateway) -> Self {
        Self::with_options(endpoints, gateway, DispatchOptions::default())
    }

    pub fn with_options(
        endpoints: Vec<Endpoint>,
        gateway: ScriptedGateway,
        options: DispatchOptions,
    ) -> Self {
        let endpoints = Arc::new(InMemoryEndpointStore::new(endpoints));
        let gateway = Arc::new(gateway);
        let stats = Arc::new(InMemoryStatsStore::default());
        let scheduled = Arc::new(InMemoryScheduledStore::default());

        let service = Arc::new(MassNotificationService::new(
            Arc::new(TypeRegistry::builtin()),
            DispatchStores {
                endpoints: endpoints.clone(),
                stats: stats.clone(),
                scheduled: scheduled.clone(),
            },
            gateway.clone(),
            options,
        ));

        Self {
            service,
            endpoints,
            gateway,
            stats,
            scheduled,
        }
    }
}
