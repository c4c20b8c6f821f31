// ==========================================
// 银行多数据集流水线 - 编排层
// ==========================================
// 职责: 配置解析 → 加载 → 校验 → 拆表 → 写出
// ==========================================

pub mod orchestrator;

pub use orchestrator::{run_pipeline, run_with_env, PipelineAbort, PipelineOrchestrator};
