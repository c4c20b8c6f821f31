// ==========================================
// 银行多数据集流水线 - 阶段计时
// ==========================================
// 职责: StageTimer drop guard，退出作用域时记录 elapsed_ms
// 日志: target = "perf"
// ==========================================

use std::cell::Cell;
use std::time::Instant;

/// 环境变量布尔值解析（1/true/yes/y/on）
pub fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 阶段计时 Guard：Drop 时写日志并回填耗时
///
/// 使用方式：
/// ```ignore
/// let slot = Cell::new(0);
/// {
///     let _timer = StageTimer::new("validate", &slot);
///     // do work...
/// }
/// assert!(slot.get() >= 0);
/// ```
pub struct StageTimer<'a> {
    stage: &'static str,
    start: Instant,
    slot: &'a Cell<u64>,
}

impl<'a> StageTimer<'a> {
    pub fn new(stage: &'static str, slot: &'a Cell<u64>) -> Self {
        Self {
            stage,
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for StageTimer<'_> {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        self.slot.set(elapsed_ms);

        tracing::info!(
            target: "perf",
            stage = self.stage,
            elapsed_ms,
            "done"
        );
    }
}
