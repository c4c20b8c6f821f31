// ==========================================
// 银行多数据集流水线 - 业务规则校验
// ==========================================
// 职责: 按规则表检查数值区间 / 枚举 / 透支额度 / 年龄 / 容差带
//       按血缘检查流水余额一致性
// 红线: 字段缺失默认不在此报告（由格式规则的必填检查负责），
//       仅 flag_missing 规则将缺失视为违规
// ==========================================

use crate::config::rules::{BusinessRule, Condition, FieldConstraint, RunningBalanceRule};
use crate::domain::lineage::{EntityRef, LineageIndex};
use crate::domain::record::Entity;
use crate::domain::report::Violation;
use crate::domain::types::{EntityLevel, ViolationCategory};
use crate::domain::value::{is_blank, is_integer, numeric, parse_timestamp, scalar_text};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

/// 逐条规则检查
pub fn check_rules(
    index: &LineageIndex<'_>,
    rules: &[BusinessRule],
    as_of: NaiveDate,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for rule in rules {
        for entity_ref in index.entities(rule.level) {
            if !applies(rule.when.as_ref(), entity_ref.entity) {
                continue;
            }
            let value = entity_ref.entity.get(&rule.field);
            let reason = match value {
                _ if is_blank(value) => rule.flag_missing.then(|| "缺少取值".to_string()),
                Some(v) => breach(&rule.constraint, v, entity_ref.entity, as_of),
                None => None,
            };
            if let Some(reason) = reason {
                violations.push(
                    Violation::new(
                        ViolationCategory::Business,
                        rule.severity,
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

fn applies(condition: Option<&Condition>, entity: &Entity) -> bool {
    match condition {
        None => true,
        Some(cond) => entity
            .text(&cond.field)
            .map(|v| cond.one_of.iter().any(|allowed| *allowed == v))
            .unwrap_or(false),
    }
}

/// 返回违规原因；满足约束时为 None
fn breach(constraint: &FieldConstraint, value: &Value, entity: &Entity, as_of: NaiveDate) -> Option<String> {
    match constraint {
        FieldConstraint::Range { min, max, integer } => {
            let Some(n) = numeric(value) else {
                return Some(format!("取值 {} 不是数值", value));
            };
            if *integer && !is_integer(value) {
                return Some(format!("取值 {} 必须为整数", value));
            }
            out_of_range(n, *min, *max)
        }
        FieldConstraint::OneOf { values } => {
            let text = scalar_text(value).unwrap_or_default();
            if values.iter().any(|v| *v == text) {
                None
            } else {
                Some(format!("取值 '{}' 不在允许范围 {:?} 内", text, values))
            }
        }
        FieldConstraint::NotBelowNegated { field } => {
            let Some(n) = numeric(value) else {
                return Some(format!("取值 {} 不是数值", value));
            };
            // 额度缺失按 0 处理
            let limit = entity.number(field).unwrap_or(0.0);
            if n < -limit {
                Some(format!("取值 {} 低于 -{}（{}={}）", n, field, field, limit))
            } else {
                None
            }
        }
        FieldConstraint::AgeYears { min, max } => {
            // 无法解析的日期交给格式规则
            let born = scalar_text(value).and_then(|t| parse_timestamp(&t))?.date();
            let age = f64::from(full_years(born, as_of));
            if age < *min || age > *max {
                Some(format!("年龄 {} 岁超出 [{}, {}]", age, min, max))
            } else {
                None
            }
        }
    }
}

fn out_of_range(n: f64, min: Option<f64>, max: Option<f64>) -> Option<String> {
    match (min, max) {
        (Some(lo), _) if n < lo => Some(format!("取值 {} 低于下限 {}", n, lo)),
        (_, Some(hi)) if n > hi => Some(format!("取值 {} 高于上限 {}", n, hi)),
        _ => None,
    }
}

/// 截至 as_of 的周岁
fn full_years(born: NaiveDate, as_of: NaiveDate) -> i32 {
    let mut years = as_of.year() - born.year();
    if (as_of.month(), as_of.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years
}

/// 流水余额一致性
///
/// 对每个子实体，按批次遍历顺序取唯一解析到它的孙实体；
/// 相邻两笔均带余额时，后者余额 - 前者余额 必须等于后者金额（容差内）
pub fn check_running_balance(index: &LineageIndex<'_>, rule: &RunningBalanceRule) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (child_idx, child_ref) in index.entities(EntityLevel::Child).iter().enumerate() {
        let mut previous: Option<(&EntityRef<'_>, f64)> = None;

        for &gc_idx in index.descendants(EntityLevel::Child, child_idx) {
            let Some(gc_ref) = index.get(EntityLevel::Grandchild, gc_idx) else {
                continue;
            };
            let Some(balance) = gc_ref.entity.number(&rule.balance_field) else {
                continue;
            };

            if let (Some((prev_ref, prev_balance)), Some(amount)) =
                (previous, gc_ref.entity.number(&rule.amount_field))
            {
                let expected = prev_balance + amount;
                if (balance - expected).abs() > rule.tolerance {
                    violations.push(
                        Violation::error(
                            ViolationCategory::Business,
                            EntityLevel::Grandchild,
                            gc_ref.id(),
                            format!(
                                "[running_balance] {} 下 {} 的 {}={:.2} 与 {}({:.2}) + {}({:.2}) = {:.2} 不一致",
                                child_ref.id(),
                                gc_ref.id(),
                                rule.balance_field,
                                balance,
                                prev_ref.id(),
                                prev_balance,
                                rule.amount_field,
                                amount,
                                expected
                            ),
                        )
                        .with_field(rule.balance_field.clone())
                        .with_related(child_ref.id()),
                    );
                }
            }

            previous = Some((gc_ref, balance));
        }
    }

    violations
}
