// ==========================================
// 银行多数据集流水线 - 格式规则校验
// ==========================================
// 职责: 必填 / 正则 / 枚举 / 日期格式
// 级别: 关键字段 → 错误；其余 → 警告
// ==========================================

use crate::config::rules::{FormatCheck, FormatRule};
use crate::domain::lineage::LineageIndex;
use crate::domain::report::Violation;
use crate::domain::types::{Severity, ViolationCategory};
use crate::domain::value::{is_blank, matches_date_format, scalar_text};
use crate::error::ConfigError;
use regex::Regex;

struct CompiledRule {
    rule: FormatRule,
    pattern: Option<Regex>,
}

/// 预编译的格式规则表
pub struct FormatTable {
    rules: Vec<CompiledRule>,
}

impl FormatTable {
    /// 编译规则表中的正则
    ///
    /// # 返回
    /// - Err(InvalidRule): 正则无法编译
    pub fn compile(rules: &[FormatRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let pattern = match &rule.check {
                    FormatCheck::Pattern { regex } => {
                        Some(Regex::new(regex).map_err(|e| ConfigError::InvalidRule {
                            rule: rule.name.clone(),
                            message: e.to_string(),
                        })?)
                    }
                    _ => None,
                };
                Ok(CompiledRule {
                    rule: rule.clone(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn check(&self, index: &LineageIndex<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for compiled in &self.rules {
            let rule = &compiled.rule;
            let severity = if rule.critical {
                Severity::Error
            } else {
                Severity::Warning
            };

            for entity_ref in index.entities(rule.level) {
                let value = entity_ref.entity.get(&rule.field);

                let reason = if is_blank(value) {
                    // 非必填字段缺失不算违规
                    matches!(rule.check, FormatCheck::Required).then(|| "缺少必填字段".to_string())
                } else {
                    let text = value.and_then(scalar_text).unwrap_or_default();
                    compiled.mismatch(&text)
                };

                if let Some(reason) = reason {
                    violations.push(
                        Violation::new(
                            ViolationCategory::Format,
                            severity,
                            rule.level,
                            entity_ref.id(),
                            format!("[{}] {} {}: {}", rule.name, entity_ref.id(), rule.field, reason),
                        )
                        .with_field(rule.field.clone()),
                    );
                }
            }
        }

        violations
    }
}

impl CompiledRule {
    fn mismatch(&self, text: &str) -> Option<String> {
        match &self.rule.check {
            FormatCheck::Required => None,
            FormatCheck::Pattern { regex } => {
                let matched = self.pattern.as_ref().map(|p| p.is_match(text)).unwrap_or(true);
                (!matched).then(|| format!("'{}' 不匹配格式 {}", text, regex))
            }
            FormatCheck::OneOf { values } => (!values.iter().any(|v| v == text))
                .then(|| format!("'{}' 不在允许取值 {:?} 内", text, values)),
            FormatCheck::Date { formats } => (!matches_date_format(text, formats))
                .then(|| format!("'{}' 不是合法日期（{}）", text, formats.join(" | "))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rules::RuleSet;
    use crate::config::schema::HierarchySchema;
    use crate::domain::types::EntityLevel;
    use crate::validator::test_support::{batch_from, sample_record};
    use serde_json::json;

    fn run(records: Vec<serde_json::Value>) -> Vec<Violation> {
        let batch = batch_from(records);
        let index = LineageIndex::build(&batch, &HierarchySchema::default());
        FormatTable::compile(&RuleSet::default().format)
            .unwrap()
            .check(&index)
    }

    #[test]
    fn test_clean_record_passes() {
        assert!(run(vec![sample_record("C1", &["A1"])]).is_empty());
    }

    #[test]
    fn test_phone_prefix_is_warning() {
        let mut record = sample_record("C1", &["A1"]);
        record["customer"]["phone"] = json!("212-555-0100");

        let violations = run(vec![record]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].field.as_deref(), Some("phone"));
    }

    #[test]
    fn test_postal_code_checked_only_when_present() {
        let mut record = sample_record("C1", &["A1"]);
        record["customer"]["postal_code"] = json!("1234");

        let violations = run(vec![record]);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].description.contains("postal_code"));
    }

    #[test]
    fn test_missing_required_field_is_error() {
        let mut record = sample_record("C1", &["A1"]);
        record["transactions"][0]["amount"] = json!(null);

        let violations = run(vec![record]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Error);
        assert_eq!(violations[0].level, EntityLevel::Grandchild);
        assert!(violations[0].description.contains("缺少必填字段"));
    }

    #[test]
    fn test_bad_date_shape_and_enum() {
        let mut record = sample_record("C1", &["A1"]);
        record["accounts"][0]["open_date"] = json!("03/01/2016");
        record["accounts"][0]["account_status"] = json!("Open");

        let violations = run(vec![record]);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].severity, Severity::Error);
        assert!(violations[0].description.contains("合法日期"));
        assert_eq!(violations[1].severity, Severity::Warning);
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let rules = vec![FormatRule {
            name: "broken".to_string(),
            level: EntityLevel::Primary,
            field: "phone".to_string(),
            check: FormatCheck::Pattern {
                regex: "([".to_string(),
            },
            critical: false,
        }];

        match FormatTable::compile(&rules) {
            Err(ConfigError::InvalidRule { rule, .. }) => assert_eq!(rule, "broken"),
            other => panic!("expected InvalidRule, got {:?}", other.map(|t| t.len())),
        }
    }
}
