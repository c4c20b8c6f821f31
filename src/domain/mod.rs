// ==========================================
// 银行多数据集流水线 - 领域模型层
// ==========================================
// 职责: 记录/批次、血缘索引、校验报告、扁平表、运行结果
// 红线: 不含 I/O，实体创建后不可变
// ==========================================

pub mod lineage;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod table;
pub mod types;
pub mod value;

// 重导出核心类型
pub use lineage::{EntityRef, LineageIndex, Resolution};
pub use pipeline::{FlattenOutputs, PipelineResult, StageTimings, TableOutput};
pub use record::{Batch, Entity, Record};
pub use report::{EntityCounts, ValidationReport, Violation};
pub use table::{FlattenResult, Table};
pub use types::{ConfigSource, EntityLevel, ExitSignal, RunState, Severity, ViolationCategory};
