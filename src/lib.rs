// ==========================================
// 银行多数据集流水线 - 核心库
// ==========================================
// 流程: 嵌套批次 → 加载 → 校验 → 拆表 → 报告
// 层级: 客户 → 账户 → 交易（外键批次级解析）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录、血缘索引、报告、扁平表
pub mod domain;

// 配置层 - 层级结构、规则表、运行配置解析
pub mod config;

// 加载层 - 嵌套 JSON 批次
pub mod loader;

// 校验层 - 四类规则族
pub mod validator;

// 拆表层 - 三张独立表 + 汇总表
pub mod flattener;

// 编排层 - 状态机与阶段顺序
pub mod pipeline;

// 报告层 - 结果文档与控制台输出
pub mod reporter;

// 错误类型
pub mod error;

// 日志系统
pub mod logging;

// 阶段计时
pub mod perf;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{DirectArgs, HierarchySchema, PipelineConfig, RuleSet};
pub use domain::{
    Batch, ExitSignal, FlattenResult, PipelineResult, RunState, ValidationReport, Violation,
};
pub use error::{ConfigError, PipelineError, StageResult};
pub use flattener::Flattener;
pub use loader::{BatchLoader, InputSource, JsonBatchLoader};
pub use pipeline::{run_pipeline, run_with_env, PipelineAbort, PipelineOrchestrator};
pub use validator::{ValidationOptions, Validator};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "银行多数据集流水线";
