use serde::{Deserialize, Serialize};

/// 单个端点的投递结果
///
/// 只在一次分发内存在，汇总后即丢弃，不逐条落库。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Rejected(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// 单批次的投递结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// 与批次内端点按位置一一对应
    pub outcomes: Vec<DeliveryOutcome>,
    /// 网关调用本身失败（无响应、超时、响应无法解析或长度不一致）
    pub batch_failed: bool,
}

impl BatchOutcome {
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self {
            outcomes,
            batch_failed: false,
        }
    }

    /// 整批失败：批次内每个端点都记为 Rejected
    pub fn failed(endpoint_count: usize, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            outcomes: vec![DeliveryOutcome::Rejected(reason); endpoint_count],
            batch_failed: true,
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }
}

/// 一次分发的汇总统计
///
/// 不变式：`sent_count + failed_count == total_endpoints`。
/// delivered/opened 由下游回执对账流程回填，创建时恒为 0。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub total_endpoints: u64,
    pub sent_count: u64,
    pub failed_count: u64,
    pub delivered_count: u64,
    pub opened_count: u64,
}

impl DispatchSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_batch(batch: &BatchOutcome) -> Self {
        let total = batch.endpoint_count() as u64;
        let sent = batch.delivered_count() as u64;
        Self {
            total_endpoints: total,
            sent_count: sent,
            failed_count: total - sent,
            delivered_count: 0,
            opened_count: 0,
        }
    }

    /// 逐字段相加，满足结合律与交换律
    pub fn merge(self, other: Self) -> Self {
        Self {
            total_endpoints: self.total_endpoints + other.total_endpoints,
            sent_count: self.sent_count + other.sent_count,
            failed_count: self.failed_count + other.failed_count,
            delivered_count: self.delivered_count + other.delivered_count,
            opened_count: self.opened_count + other.opened_count,
        }
    }

    pub fn is_conserved(&self) -> bool {
        self.sent_count + self.failed_count == self.total_endpoints
    }

    /// 用于日志和指标的结果标签
    pub fn status_label(&self) -> &'static str {
        match (self.total_endpoints, self.failed_count) {
            (0, _) => "empty",
            (_, 0) => "success",
            (total, failed) if failed == total => "failed",
            _ => "partial",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_batch_rejects_every_endpoint() {
        let outcome = BatchOutcome::failed(20, "timeout");
        assert!(outcome.batch_failed);
        assert_eq!(outcome.endpoint_count(), 20);
        assert_eq!(outcome.delivered_count(), 0);
        assert!(
            outcome
                .outcomes
                .iter()
                .all(|o| *o == DeliveryOutcome::Rejected("timeout".to_string()))
        );
    }

    #[test]
    fn test_summary_from_batch() {
        let batch = BatchOutcome::from_outcomes(vec![
            DeliveryOutcome::Delivered,
            DeliveryOutcome::Rejected("DeviceNotRegistered".to_string()),
            DeliveryOutcome::Delivered,
        ]);
        let summary = DispatchSummary::from_batch(&batch);
        assert_eq!(summary.total_endpoints, 3);
        assert_eq!(summary.sent_count, 2);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.delivered_count, 0);
        assert!(summary.is_conserved());
    }

    #[test]
    fn test_status_label() {
        let mut summary = DispatchSummary::empty();
        assert_eq!(summary.status_label(), "empty");

        summary.total_endpoints = 10;
        summary.sent_count = 10;
        assert_eq!(summary.status_label(), "success");

        summary.sent_count = 4;
        summary.failed_count = 6;
        assert_eq!(summary.status_label(), "partial");

        summary.sent_count = 0;
        summary.failed_count = 10;
        assert_eq!(summary.status_label(), "failed");
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_value(DispatchSummary::empty()).unwrap();
        assert_eq!(json["totalEndpoints"], 0);
        assert_eq!(json["sentCount"], 0);
        assert_eq!(json["openedCount"], 0);
    }
}
