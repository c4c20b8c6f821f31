// ==========================================
// 银行多数据集流水线 - 领域类型定义
// ==========================================
// 职责: 层级、违规类别/级别、运行状态、退出信号等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 实体层级 (Entity Level)
// ==========================================
// 主实体 → 子实体 → 孙实体（如 客户 → 账户 → 交易）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLevel {
    Primary,    // 主实体
    Child,      // 子实体
    Grandchild, // 孙实体
}

impl EntityLevel {
    /// 按遍历顺序排列的全部层级
    pub const ALL: [EntityLevel; 3] = [
        EntityLevel::Primary,
        EntityLevel::Child,
        EntityLevel::Grandchild,
    ];

    /// 上级层级（主实体无上级）
    pub fn parent(&self) -> Option<EntityLevel> {
        match self {
            EntityLevel::Primary => None,
            EntityLevel::Child => Some(EntityLevel::Primary),
            EntityLevel::Grandchild => Some(EntityLevel::Child),
        }
    }
}

impl fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityLevel::Primary => write!(f, "primary"),
            EntityLevel::Child => write!(f, "child"),
            EntityLevel::Grandchild => write!(f, "grandchild"),
        }
    }
}

// ==========================================
// 违规类别 (Violation Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    Referential, // 引用完整性
    Temporal,    // 时间顺序
    Business,    // 业务规则
    Format,      // 格式规则
}

impl ViolationCategory {
    pub const ALL: [ViolationCategory; 4] = [
        ViolationCategory::Referential,
        ViolationCategory::Temporal,
        ViolationCategory::Business,
        ViolationCategory::Format,
    ];
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationCategory::Referential => write!(f, "referential"),
            ViolationCategory::Temporal => write!(f, "temporal"),
            ViolationCategory::Business => write!(f, "business"),
            ViolationCategory::Format => write!(f, "format"),
        }
    }
}

// ==========================================
// 违规级别 (Severity)
// ==========================================
// 红线: 只有 Error 会使校验不通过
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,   // 错误（校验不通过）
    Warning, // 警告（仅记录）
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

// ==========================================
// 运行状态 (Run State)
// ==========================================
// CONFIGURED → LOADED → VALIDATED → FLATTENED（终态）
// 任一非终态均可进入 FAILED（终态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Configured,
    Loaded,
    Validated,
    Flattened,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Flattened | RunState::Failed)
    }

    /// 判断状态迁移是否合法
    pub fn can_transition_to(&self, next: RunState) -> bool {
        match (self, next) {
            (s, RunState::Failed) => !s.is_terminal(),
            (RunState::Configured, RunState::Loaded) => true,
            (RunState::Loaded, RunState::Validated) => true,
            (RunState::Validated, RunState::Flattened) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Configured => write!(f, "CONFIGURED"),
            RunState::Loaded => write!(f, "LOADED"),
            RunState::Validated => write!(f, "VALIDATED"),
            RunState::Flattened => write!(f, "FLATTENED"),
            RunState::Failed => write!(f, "FAILED"),
        }
    }
}

// ==========================================
// 退出信号 (Exit Signal)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignal {
    Success,          // 运行完成且校验通过
    ValidationFailed, // 运行完成但校验不通过
    Fatal,            // 结构/配置错误中止
}

impl ExitSignal {
    /// 进程退出码
    pub fn code(&self) -> u8 {
        match self {
            ExitSignal::Success => 0,
            ExitSignal::ValidationFailed => 1,
            ExitSignal::Fatal => 2,
        }
    }
}

// ==========================================
// 配置来源 (Config Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    JobParamFile, // 作业参数文件
    Environment,  // 进程环境变量
    DirectArgs,   // 调用方直接参数
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::JobParamFile => write!(f, "job_param_file"),
            ConfigSource::Environment => write!(f, "environment"),
            ConfigSource::DirectArgs => write!(f, "direct_args"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_transitions() {
        assert!(RunState::Configured.can_transition_to(RunState::Loaded));
        assert!(RunState::Loaded.can_transition_to(RunState::Validated));
        assert!(RunState::Validated.can_transition_to(RunState::Flattened));
        assert!(RunState::Loaded.can_transition_to(RunState::Failed));

        // 不允许跳级
        assert!(!RunState::Configured.can_transition_to(RunState::Validated));
        // 终态不可再迁移
        assert!(!RunState::Flattened.can_transition_to(RunState::Failed));
        assert!(!RunState::Failed.can_transition_to(RunState::Failed));
    }

    #[test]
    fn test_exit_signal_codes_distinct() {
        assert_eq!(ExitSignal::Success.code(), 0);
        assert_ne!(ExitSignal::ValidationFailed.code(), 0);
        assert_ne!(ExitSignal::Fatal.code(), 0);
        assert_ne!(ExitSignal::ValidationFailed.code(), ExitSignal::Fatal.code());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&RunState::Flattened).unwrap(),
            "\"FLATTENED\""
        );
        assert_eq!(
            serde_json::to_string(&ViolationCategory::Referential).unwrap(),
            "\"referential\""
        );
    }
}
