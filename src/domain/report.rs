// ==========================================
// 银行多数据集流水线 - 校验报告
// ==========================================
// 职责: Violation 记录 + ValidationReport 汇总
// 红线: 错误数/警告数/通过标志均由违规列表派生，不可单独设置
// ==========================================

use crate::domain::types::{EntityLevel, Severity, ViolationCategory};
use serde::{Deserialize, Serialize};

// ==========================================
// Violation - 单条规则违规
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub category: ViolationCategory, // 违规类别
    pub severity: Severity,          // 违规级别
    pub level: EntityLevel,          // 违规实体所在层级
    pub entity_id: String,           // 违规实体标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>, // 违规字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>, // 关联标识（悬空外键 / 上级实体）
    pub description: String, // 违规描述
}

impl Violation {
    pub fn new(
        category: ViolationCategory,
        severity: Severity,
        level: EntityLevel,
        entity_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            level,
            entity_id: entity_id.into(),
            field: None,
            related_id: None,
            description: description.into(),
        }
    }

    pub fn error(
        category: ViolationCategory,
        level: EntityLevel,
        entity_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(category, Severity::Error, level, entity_id, description)
    }

    pub fn warning(
        category: ViolationCategory,
        level: EntityLevel,
        entity_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(category, Severity::Warning, level, entity_id, description)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_related(mut self, related_id: impl Into<String>) -> Self {
        self.related_id = Some(related_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ==========================================
// EntityCounts - 各层级实体数量
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub primary: usize,
    pub child: usize,
    pub grandchild: usize,
}

impl EntityCounts {
    pub fn get(&self, level: EntityLevel) -> usize {
        match level {
            EntityLevel::Primary => self.primary,
            EntityLevel::Child => self.child,
            EntityLevel::Grandchild => self.grandchild,
        }
    }
}

// ==========================================
// ValidationReport - 校验报告
// ==========================================
// 每次校验新建，返回后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    passed: bool,
    #[serde(rename = "errors")]
    error_count: usize,
    #[serde(rename = "warnings")]
    warning_count: usize,
    entity_counts: EntityCounts,
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// 由违规列表派生报告
    pub fn new(entity_counts: EntityCounts, violations: Vec<Violation>) -> Self {
        let error_count = violations.iter().filter(|v| v.is_error()).count();
        let warning_count = violations.len() - error_count;

        Self {
            passed: error_count == 0,
            error_count,
            warning_count,
            entity_counts,
            violations,
        }
    }

    /// 追加一条违规，返回新报告（原报告不变）
    pub fn with_violation(&self, violation: Violation) -> Self {
        let mut violations = self.violations.clone();
        violations.push(violation);
        Self::new(self.entity_counts, violations)
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn entity_counts(&self) -> EntityCounts {
        self.entity_counts
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.is_error())
    }

    /// 指定类别的违规
    pub fn in_category(&self, category: ViolationCategory) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.category == category)
    }
}
