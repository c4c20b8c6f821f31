// ==========================================
// 银行多数据集流水线 - 引用完整性校验
// ==========================================
// 职责: 标识唯一性 + 外键批次级解析
// 规则: 子实体外键必须唯一解析到主实体；孙实体外键必须唯一解析到任一子实体
// ==========================================

use crate::config::schema::HierarchySchema;
use crate::domain::lineage::{LineageIndex, Resolution};
use crate::domain::report::Violation;
use crate::domain::types::{EntityLevel, ViolationCategory};
use std::collections::HashSet;

pub fn check(index: &LineageIndex<'_>, schema: &HierarchySchema) -> Vec<Violation> {
    let mut violations = Vec::new();

    for level in EntityLevel::ALL {
        check_duplicates(index, schema, level, &mut violations);
    }
    for level in [EntityLevel::Child, EntityLevel::Grandchild] {
        check_foreign_keys(index, schema, level, &mut violations);
    }

    violations
}

/// 同层级标识重复（第二次及以后的出现各记一条）
fn check_duplicates(
    index: &LineageIndex<'_>,
    schema: &HierarchySchema,
    level: EntityLevel,
    violations: &mut Vec<Violation>,
) {
    let level_schema = schema.level(level);
    let mut seen = HashSet::new();

    for entity_ref in index.entities(level) {
        if !seen.insert(entity_ref.id()) {
            violations.push(
                Violation::error(
                    ViolationCategory::Referential,
                    level,
                    entity_ref.id(),
                    format!(
                        "{} 标识重复: {}={}（记录[{}]）",
                        level_schema.table,
                        level_schema.id_field,
                        entity_ref.id(),
                        entity_ref.record
                    ),
                )
                .with_field(level_schema.id_field.clone()),
            );
        }
    }
}

fn check_foreign_keys(
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
    let Some(fk_field) = level_schema.parent_fk.as_deref() else {
        return;
    };

    for (idx, entity_ref) in index.entities(level).iter().enumerate() {
        let violation = match (entity_ref.parent_key.as_deref(), index.resolve_parent(level, idx)) {
            (None, _) | (_, None) => Some(Violation::error(
                ViolationCategory::Referential,
                level,
                entity_ref.id(),
                format!(
                    "{} {} 缺少外键 {}",
                    level_schema.table,
                    entity_ref.id(),
                    fk_field
                ),
            )),
            (Some(key), Some(Resolution::Missing)) => Some(
                Violation::error(
                    ViolationCategory::Referential,
                    level,
                    entity_ref.id(),
                    format!(
                        "{} {} 的外键 {}='{}' 在批次中找不到对应的 {}",
                        level_schema.table,
                        entity_ref.id(),
                        fk_field,
                        key,
                        parent_schema.table
                    ),
                )
                .with_related(key),
            ),
            (Some(key), Some(Resolution::Ambiguous(count))) => Some(
                Violation::error(
                    ViolationCategory::Referential,
                    level,
                    entity_ref.id(),
                    format!(
                        "{} {} 的外键 {}='{}' 匹配到 {} 个 {}，无法唯一解析",
                        level_schema.table,
                        entity_ref.id(),
                        fk_field,
                        key,
                        count,
                        parent_schema.table
                    ),
                )
                .with_related(key),
            ),
            (Some(_), Some(Resolution::Unique(_))) => None,
        };

        if let Some(v) = violation {
            violations.push(v.with_field(fk_field));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::test_support::{batch_from, sample_record};
    use serde_json::json;

    fn run(batch: &crate::domain::record::Batch) -> Vec<Violation> {
        let schema = HierarchySchema::default();
        let index = LineageIndex::build(batch, &schema);
        check(&index, &schema)
    }

    #[test]
    fn test_all_resolved() {
        let batch = batch_from(vec![sample_record("C1", &["A1", "A2"]), sample_record("C2", &["A3"])]);
        assert!(run(&batch).is_empty());
    }

    #[test]
    fn test_dangling_grandchild_reference() {
        let mut record = sample_record("C1", &["A1"]);
        record["transactions"]
            .as_array_mut()
            .unwrap()
            .push(json!({"transaction_id": "T-X", "account_id": "ACC-404"}));
        let batch = batch_from(vec![record]);

        let violations = run(&batch);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entity_id, "T-X");
        assert_eq!(violations[0].related_id.as_deref(), Some("ACC-404"));
        assert!(violations[0].description.contains("ACC-404"));
    }

    #[test]
    fn test_cross_record_reference_is_legal() {
        let mut first = sample_record("C1", &["A1"]);
        first["transactions"]
            .as_array_mut()
            .unwrap()
            .push(json!({"transaction_id": "T-CROSS", "account_id": "A2"}));
        let batch = batch_from(vec![first, sample_record("C2", &["A2"])]);

        assert!(run(&batch).is_empty());
    }

    #[test]
    fn test_duplicate_primary_makes_references_ambiguous() {
        let batch = batch_from(vec![sample_record("C1", &["A1"]), sample_record("C1", &["A2"])]);

        let violations = run(&batch);
        // 1 条重复标识 + 2 条歧义外键（A1、A2 均指向重复的 C1）
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].field.as_deref(), Some("cust_id"));
        assert!(violations[0].description.contains("标识重复"));
        assert!(violations[1..].iter().all(|v| v.description.contains("无法唯一解析")));
    }

    #[test]
    fn test_missing_foreign_key() {
        let mut record = sample_record("C1", &["A1"]);
        record["accounts"][0].as_object_mut().unwrap().remove("cust_id");
        let batch = batch_from(vec![record]);

        let violations = run(&batch);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entity_id, "A1");
        assert!(violations[0].description.contains("缺少外键"));
    }
}
