//! 批次发送
//!
//! 每个批次构造一次网关调用，回执按位置映射为端点结果。
//! 网关调用失败（无响应、超时、响应无法解析、回执数量不符）时整批记为失败。

use std::sync::Arc;
use std::time::Instant;

use push_shared::observability::metrics;
use push_shared::retry::{RetryPolicy, retry_with_policy};
use tracing::{debug, warn};

use crate::gateway::{GatewayError, PushGateway, PushMessage};
use crate::models::{BatchOutcome, DeliveryOutcome, Endpoint, NotificationRequest};

/// 推送默认提示音
pub const DEFAULT_SOUND: &str = "default";

/// 角标增量
pub const BADGE_INCREMENT: u32 = 1;

pub struct Dispatcher {
    gateway: Arc<dyn PushGateway>,
    retry: RetryPolicy,
}

impl Dispatcher {
    /// `retry` 只作用于可重试的网关错误，`RetryPolicy::none()` 时每批恰好一次调用
    pub fn new(gateway: Arc<dyn PushGateway>, retry: RetryPolicy) -> Self {
        Self { gateway, retry }
    }

    /// 为批次内每个端点构造一条消息
    ///
    /// data 为请求 payload 合并 `ownerId`、`platform`、`massNotification`，同名键以后者为准
    pub fn build_messages(batch: &[Endpoint], request: &NotificationRequest) -> Vec<PushMessage> {
        batch
            .iter()
            .map(|endpoint| {
                let mut data = request.payload.clone();
                data.insert(
                    "ownerId".to_string(),
                    serde_json::Value::String(endpoint.owner_id.clone()),
                );
                data.insert(
                    "platform".to_string(),
                    serde_json::Value::String(endpoint.platform.to_string()),
                );
                data.insert("massNotification".to_string(), serde_json::Value::Bool(true));

                PushMessage {
                    to: endpoint.token.clone(),
                    title: request.title.clone(),
                    body: request.body.clone(),
                    data,
                    sound: DEFAULT_SOUND.to_string(),
                    badge: BADGE_INCREMENT,
                }
            })
            .collect()
    }

    /// 发送一个批次
    ///
    /// 不返回错误：网关失败折算为整批 Rejected，不影响其他批次。
    pub async fn send(
        &self,
        batch_index: usize,
        batch: &[Endpoint],
        request: &NotificationRequest,
    ) -> BatchOutcome {
        let messages = Self::build_messages(batch, request);
        let started = Instant::now();

        let gateway = self.gateway.as_ref();
        let outbound = messages.as_slice();
        let result = retry_with_policy(
            &self.retry,
            "push_gateway_batch",
            GatewayError::is_retryable,
            move || async move {
                let tickets = gateway.send_batch(outbound).await?;
                if tickets.len() != outbound.len() {
                    return Err(GatewayError::LengthMismatch {
                        expected: outbound.len(),
                        actual: tickets.len(),
                    });
                }
                Ok(tickets)
            },
        )
        .await;

        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(tickets) => {
                metrics::record_gateway_batch("ok", batch.len(), elapsed);
                let outcomes: Vec<_> = tickets
                    .iter()
                    .map(|ticket| {
                        if ticket.is_ok() {
                            DeliveryOutcome::Delivered
                        } else {
                            DeliveryOutcome::Rejected(ticket.rejection_reason())
                        }
                    })
                    .collect();
                let outcome = BatchOutcome::from_outcomes(outcomes);
                debug!(
                    batch_index,
                    batch_size = batch.len(),
                    delivered = outcome.delivered_count(),
                    "批次发送完成"
                );
                outcome
            }
            Err(e) => {
                metrics::record_gateway_batch(e.label(), batch.len(), elapsed);
                warn!(
                    batch_index,
                    batch_size = batch.len(),
                    error = %e,
                    "批次发送失败，整批计为失败"
                );
                BatchOutcome::failed(batch.len(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockPushGateway, PushTicket};
    use crate::models::{AudienceSpec, Platform};
    use chrono::Utc;
    use std::time::Duration;

    fn batch(n: usize) -> Vec<Endpoint> {
        (0..n)
            .map(|i| Endpoint::new(format!("token-{i}"), Platform::Ios, format!("u{i}"), Utc::now()))
            .collect()
    }

    fn request() -> NotificationRequest {
        NotificationRequest::new("标题", "内容", AudienceSpec::All)
            .with_data("orderId", serde_json::json!(7))
            .with_data("platform", serde_json::json!("spoofed"))
    }

    #[test]
    fn test_build_messages_merges_engine_fields() {
        let messages = Dispatcher::build_messages(&batch(2), &request());

        assert_eq!(messages.len(), 2);
        let first = &messages[0];
        assert_eq!(first.to, "token-0");
        assert_eq!(first.sound, "default");
        assert_eq!(first.badge, 1);
        assert_eq!(first.data["orderId"], serde_json::json!(7));
        assert_eq!(first.data["ownerId"], serde_json::json!("u0"));
        assert_eq!(first.data["platform"], serde_json::json!("ios"));
        assert_eq!(first.data["massNotification"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_tickets_map_by_position() {
        let mut gateway = MockPushGateway::new();
        gateway.expect_send_batch().times(1).returning(|_| {
            Ok(vec![
                PushTicket::ok(),
                PushTicket::error("error", "DeviceNotRegistered"),
                PushTicket::ok(),
            ])
        });

        let dispatcher = Dispatcher::new(Arc::new(gateway), RetryPolicy::none());
        let outcome = dispatcher.send(0, &batch(3), &request()).await;

        assert!(!outcome.batch_failed);
        assert_eq!(
            outcome.outcomes,
            vec![
                DeliveryOutcome::Delivered,
                DeliveryOutcome::Rejected("DeviceNotRegistered".to_string()),
                DeliveryOutcome::Delivered,
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_fails_whole_batch_without_retry() {
        let mut gateway = MockPushGateway::new();
        gateway
            .expect_send_batch()
            .times(1)
            .returning(|_| Err(GatewayError::Timeout(10_000)));

        let dispatcher = Dispatcher::new(Arc::new(gateway), RetryPolicy::none());
        let outcome = dispatcher.send(1, &batch(20), &request()).await;

        assert!(outcome.batch_failed);
        assert_eq!(outcome.endpoint_count(), 20);
        assert_eq!(outcome.delivered_count(), 0);
    }

    #[tokio::test]
    async fn test_length_mismatch_fails_whole_batch() {
        let mut gateway = MockPushGateway::new();
        gateway
            .expect_send_batch()
            .times(1)
            .returning(|_| Ok(vec![PushTicket::ok()]));

        let dispatcher = Dispatcher::new(Arc::new(gateway), RetryPolicy::none());
        let outcome = dispatcher.send(0, &batch(2), &request()).await;

        assert!(outcome.batch_failed);
        assert_eq!(outcome.delivered_count(), 0);
        assert_eq!(outcome.endpoint_count(), 2);
    }

    #[tokio::test]
    async fn test_bounded_retry_recovers_transient_failure() {
        let mut gateway = MockPushGateway::new();
        let mut seq = mockall::Sequence::new();
        gateway
            .expect_send_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(GatewayError::Transport("connection reset".to_string())));
        gateway
            .expect_send_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|messages| Ok(messages.iter().map(|_| PushTicket::ok()).collect()));

        let retry = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        };
        let dispatcher = Dispatcher::new(Arc::new(gateway), retry);
        let outcome = dispatcher.send(0, &batch(5), &request()).await;

        assert!(!outcome.batch_failed);
        assert_eq!(outcome.delivered_count(), 5);
    }
}
