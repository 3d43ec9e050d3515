//! 定时通知仓储
//!
//! payload 与 audience 以 JSONB 存储；状态迁移全部是带
//! `status = 'scheduled'` 条件的单条 UPDATE，影响行数即迁移是否成功。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use push_shared::error::Result;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::traits::ScheduledNotificationStore;
use crate::models::{AudienceSpec, Payload, ScheduleStatus, ScheduledNotification};

/// 数据库行映射
#[derive(Debug, sqlx::FromRow)]
struct ScheduledRow {
    id: Uuid,
    title: String,
    body: String,
    payload: Json<Payload>,
    audience: Json<AudienceSpec>,
    notification_type: Option<String>,
    scheduled_at: DateTime<Utc>,
    status: ScheduleStatus,
    created_at: DateTime<Utc>,
}

impl From<ScheduledRow> for ScheduledNotification {
    fn from(row: ScheduledRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            body: row.body,
            payload: row.payload.0,
            audience: row.audience.0,
            notification_type: row.notification_type,
            scheduled_at: row.scheduled_at,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, title, body, payload, audience, notification_type, \
     scheduled_at, status, created_at FROM scheduled_notifications";

pub struct ScheduledNotificationRepository {
    pool: PgPool,
}

impl ScheduledNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, record: &ScheduledNotification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_notifications
                (id, title, body, payload, audience, notification_type,
                 scheduled_at, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.body)
        .bind(Json(&record.payload))
        .bind(Json(&record.audience))
        .bind(&record.notification_type)
        .bind(record.scheduled_at)
        .bind(record.status)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ScheduledNotification>> {
        let row = sqlx::query_as::<_, ScheduledRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// 按计划时间倒序列出，可按状态过滤
    pub async fn list(
        &self,
        status: Option<ScheduleStatus>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        let rows = sqlx::query_as::<_, ScheduledRow>(&format!(
            "{SELECT_COLUMNS} WHERE ($1::varchar IS NULL OR status = $1) \
             ORDER BY scheduled_at DESC LIMIT $2"
        ))
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_due(
        &self,
        now: DateTime<Utc>,
        enabled_types: &[String],
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        let rows = sqlx::query_as::<_, ScheduledRow>(&format!(
            "{SELECT_COLUMNS} WHERE status = 'scheduled' AND scheduled_at <= $1 \
             AND (notification_type IS NULL OR notification_type = ANY($2)) \
             ORDER BY scheduled_at ASC LIMIT $3"
        ))
        .bind(now)
        .bind(enabled_types)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn cancel(&self, id: Uuid) -> Result<bool> {
        self.transition(id, ScheduleStatus::Cancelled).await
    }

    pub async fn mark_dispatched(&self, id: Uuid) -> Result<bool> {
        self.transition(id, ScheduleStatus::Dispatched).await
    }

    /// 仅当记录仍处于 Scheduled 时迁移
    async fn transition(&self, id: Uuid, to: ScheduleStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_notifications
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'scheduled'
            "#,
        )
        .bind(id)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ScheduledNotificationStore for ScheduledNotificationRepository {
    async fn create(&self, record: &ScheduledNotification) -> Result<()> {
        self.create(record).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledNotification>> {
        self.get(id).await
    }

    async fn list(
        &self,
        status: Option<ScheduleStatus>,
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        self.list(status, limit).await
    }

    async fn list_due(
        &self,
        now: DateTime<Utc>,
        enabled_types: &[String],
        limit: i64,
    ) -> Result<Vec<ScheduledNotification>> {
        self.list_due(now, enabled_types, limit).await
    }

    async fn cancel(&self, id: Uuid) -> Result<bool> {
        self.cancel(id).await
    }

    async fn mark_dispatched(&self, id: Uuid) -> Result<bool> {
        self.mark_dispatched(id).await
    }
}
