// ==========================================
// 银行多数据集流水线 - 配置层
// ==========================================
// 职责: 层级结构描述、规则表、运行配置解析
// 来源: 作业参数文件 > 环境变量 > 直接参数
// ==========================================

pub mod resolver;
pub mod rules;
pub mod schema;

// 重导出核心配置类型
pub use resolver::{
    resolve_config, ConfigResolver, DirectArgs, EnvProvider, JobParamGuard, MapEnv,
    PipelineConfig, ProcessEnv, ResolvedConfig,
};
pub use rules::RuleSet;
pub use schema::{HierarchySchema, LevelSchema};
