//! 分批
//!
//! 按网关单次调用上限把端点切成有序批次。纯函数，不做任何 I/O。

use push_shared::config::MAX_BATCH_SIZE;

/// 把序列切分为不超过 `max_size` 的有序批次
///
/// - 所有批次按顺序拼接后与输入完全一致
/// - 除最后一批外每批恰好 `max_size` 个元素
/// - 空输入返回零个批次
///
/// `max_size` 被限制在 `1..=MAX_BATCH_SIZE`。
pub fn chunk<T>(items: Vec<T>, max_size: usize) -> Vec<Vec<T>> {
    let size = max_size.clamp(1, MAX_BATCH_SIZE);
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();

    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }

    batches
}
