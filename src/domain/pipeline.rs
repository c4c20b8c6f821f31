// ==========================================
// 银行多数据集流水线 - 运行结果模型
// ==========================================
// 职责: PipelineResult（一次运行的完整结果文档）
// 所有权: 仅由编排器构建，运行结束时序列化一次
// ==========================================

use crate::domain::report::{EntityCounts, ValidationReport};
use crate::domain::types::{ConfigSource, ExitSignal, RunState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 单张输出表
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOutput {
    pub table: String,
    pub path: String,
    pub rows: usize,
}

/// 拆表输出汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenOutputs {
    pub row_counts: EntityCounts,
    pub tables: Vec<TableOutput>,
}

/// 各阶段耗时（毫秒）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub load_ms: u64,
    pub validate_ms: u64,
    pub flatten_ms: u64,
    pub write_ms: u64,
}

impl StageTimings {
    pub fn total_ms(&self) -> u64 {
        self.load_ms + self.validate_ms + self.flatten_ms + self.write_ms
    }
}

// ==========================================
// PipelineResult - 运行结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub config_source: ConfigSource,
    pub input_file: String,
    pub output_dir: String,
    pub state: RunState,
    pub validation: ValidationReport,
    pub flatten: FlattenOutputs,
    pub timings: StageTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_file: Option<String>,
}

impl PipelineResult {
    pub fn passed(&self) -> bool {
        self.validation.passed()
    }

    /// 调用方退出信号
    ///
    /// - 运行完成且校验通过 → Success
    /// - 运行完成但校验未通过 → ValidationFailed
    /// - 其余状态 → Fatal
    pub fn exit_signal(&self) -> ExitSignal {
        match self.state {
            RunState::Flattened if self.passed() => ExitSignal::Success,
            RunState::Flattened => ExitSignal::ValidationFailed,
            _ => ExitSignal::Fatal,
        }
    }
}
