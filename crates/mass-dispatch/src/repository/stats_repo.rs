//! 群发统计仓储

use async_trait::async_trait;
use push_shared::error::Result;
use sqlx::PgPool;

use super::traits::StatsStore;
use crate::models::{DispatchStatsRecord, NewDispatchStats};

pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 追加一条统计，delivered/opened 由回执对账流程回填
    pub async fn insert_stats(&self, stats: &NewDispatchStats) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO mass_notification_stats
                (title, body, target_audience, notification_type,
                 total_users, sent_count, failed_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&stats.title)
        .bind(&stats.body)
        .bind(&stats.target_audience)
        .bind(&stats.notification_type)
        .bind(stats.total_users)
        .bind(stats.sent_count)
        .bind(stats.failed_count)
        .bind(stats.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<DispatchStatsRecord>> {
        let records = sqlx::query_as::<_, DispatchStatsRecord>(
            r#"
            SELECT id, title, body, target_audience, notification_type,
                   total_users, sent_count, failed_count, delivered_count,
                   opened_count, created_at
            FROM mass_notification_stats
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl StatsStore for StatsRepository {
    async fn insert_stats(&self, stats: &NewDispatchStats) -> Result<i64> {
        self.insert_stats(stats).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<DispatchStatsRecord>> {
        self.list_recent(limit).await
    }
}
