//! 统计聚合
//!
//! 按批次结果增量累加，任何时刻的快照都满足：
//! `processed == success + error`、`processed <= total`、`completed <= batches_total`

use serde::Serialize;
use tracing::warn;

/// 任务统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_records: usize,
    pub processed_records: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub batches_total: usize,
    pub batches_completed: usize,
}

impl Stats {
    /// 任务启动时的初始统计
    pub fn initialized(total_records: usize, batches_total: usize) -> Self {
        Self {
            total_records,
            batches_total,
            ..Default::default()
        }
    }

    /// 记录一个批次的结果
    ///
    /// 超出总量的部分会被截断，保证 `processed <= total`。
    /// 返回 `false` 表示发生了截断（批次数据与初始化时的总量不一致）
    #[must_use]
    pub fn record_batch(&mut self, batch_len: usize, success: bool) -> bool {
        let remaining = self.total_records - self.processed_records;
        let counted = batch_len.min(remaining);
        let mut exact = counted == batch_len;

        self.processed_records += counted;
        if success {
            self.success_count += counted;
        } else {
            self.error_count += counted;
        }
        if self.batches_completed < self.batches_total {
            self.batches_completed += 1;
        } else {
            exact = false;
        }

        if !exact {
            warn!(
                "⚠️ 批次统计超出总量已截断: 批次 {} 条, 剩余 {} 条, 批次进度 {}/{}",
                batch_len, remaining, self.batches_completed, self.batches_total
            );
        }
        exact
    }

    /// 完成百分比，范围 [0, 100]
    pub fn percent_complete(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.processed_records as f64 * 100.0 / self.total_records as f64
    }

    pub fn holds_invariants(&self) -> bool {
        self.processed_records == self.success_count + self.error_count
            && self.processed_records <= self.total_records
            && self.batches_completed <= self.batches_total
    }
}
