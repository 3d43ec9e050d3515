//! 结果汇总
//!
//! 逐批折叠为一份计数汇总。折叠满足结合律与交换律，
//! 所以批次以任意并发度、任意完成顺序返回都得到同一结果。

use crate::models::{BatchOutcome, DispatchSummary};

pub fn fold<'a, I>(outcomes: I) -> DispatchSummary
where
    I: IntoIterator<Item = &'a BatchOutcome>,
{
    outcomes
        .into_iter()
        .map(DispatchSummary::from_batch)
        .fold(DispatchSummary::empty(), DispatchSummary::merge)
}
