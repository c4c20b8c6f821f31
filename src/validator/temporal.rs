// ==========================================
// 银行多数据集流水线 - 时序一致性校验
// ==========================================
// 规则链: 主实体 since ≤ 子实体 opened ≤ 孙实体 occurred
// 沿实际外键链逐级比较（仅唯一解析的链路），不假设同一记录
// ==========================================

use crate::config::schema::HierarchySchema;
use crate::domain::lineage::LineageIndex;
use crate::domain::report::Violation;
use crate::domain::types::{EntityLevel, ViolationCategory};
use crate::domain::value::parse_timestamp;
use chrono::{Duration, NaiveDateTime};

pub fn check(index: &LineageIndex<'_>, schema: &HierarchySchema) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_link(index, schema, EntityLevel::Child, &mut violations);
    check_link(index, schema, EntityLevel::Grandchild, &mut violations);
    violations
}

/// 校验 level 与其直接上级之间的时间先后
fn check_link(
    index: &LineageIndex<'_>,
    schema: &HierarchySchema,
    level: EntityLevel,
    violations: &mut Vec<Violation>,
) {
    let Some(parent_level) = level.parent() else {
        return;
    };
    let level_schema = schema.level(level);
    let parent_schema = schema.level(parent_level);
    let (Some(own_field), Some(parent_field)) = (
        level_schema.timestamp_field.as_deref(),
        parent_schema.timestamp_field.as_deref(),
    ) else {
        return;
    };

    for (idx, entity_ref) in index.entities(level).iter().enumerate() {
        let Some(parent_ref) = index
            .unique_parent(level, idx)
            .and_then(|p| index.get(parent_level, p))
        else {
            continue;
        };

        // 时间缺失或无法解析由格式规则负责
        let Some(own_ts) = timestamp(entity_ref.entity.text(own_field)) else {
            continue;
        };
        let Some(parent_ts) = timestamp(parent_ref.entity.text(parent_field)) else {
            continue;
        };

        if own_ts < parent_ts {
            violations.push(
                Violation::error(
                    ViolationCategory::Temporal,
                    level,
                    entity_ref.id(),
                    format!(
                        "{} {} 的 {}={} 早于 {} {} 的 {}={}，相差 {}",
                        level_schema.table,
                        entity_ref.id(),
                        own_field,
                        own_ts,
                        parent_schema.table,
                        parent_ref.id(),
                        parent_field,
                        parent_ts,
                        describe_gap(parent_ts - own_ts)
                    ),
                )
                .with_field(own_field)
                .with_related(parent_ref.id()),
            );
        }
    }
}

fn timestamp(text: Option<String>) -> Option<NaiveDateTime> {
    text.as_deref().and_then(parse_timestamp)
}

/// 时间差描述（满一天按天，否则按小时/分钟）
fn describe_gap(gap: Duration) -> String {
    if gap.num_days() >= 1 {
        format!("{} 天", gap.num_days())
    } else if gap.num_hours() >= 1 {
        format!("{} 小时", gap.num_hours())
    } else {
        format!("{} 分钟", gap.num_minutes().max(1))
    }
}
