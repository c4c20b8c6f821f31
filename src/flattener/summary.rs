// ==========================================
// 银行多数据集流水线 - 主实体汇总表
// ==========================================
// 职责: 每个主实体一行 = 主实体全部字段 + 下级聚合列
// 聚合沿血缘索引进行（跨记录引用计入被引用的上级）
// ==========================================

use crate::config::schema::HierarchySchema;
use crate::domain::lineage::LineageIndex;
use crate::domain::record::Batch;
use crate::domain::table::Table;
use crate::domain::types::EntityLevel;
use serde_json::{json, Value};
use std::collections::HashSet;

pub const NUM_CHILDREN: &str = "num_children";
pub const CHILD_SUBTYPES: &str = "child_subtypes";
pub const TOTAL_BALANCE: &str = "total_balance";
pub const NUM_GRANDCHILDREN: &str = "num_grandchildren";
pub const GRANDCHILD_CATEGORIES: &str = "grandchild_categories";

const AGGREGATE_COLUMNS: [&str; 5] = [
    NUM_CHILDREN,
    CHILD_SUBTYPES,
    TOTAL_BALANCE,
    NUM_GRANDCHILDREN,
    GRANDCHILD_CATEGORIES,
];

/// 去重且保持首次出现顺序
#[derive(Default)]
struct Distinct {
    seen: HashSet<String>,
    values: Vec<String>,
}

impl Distinct {
    fn add(&mut self, value: Option<String>) {
        if let Some(v) = value {
            if self.seen.insert(v.clone()) {
                self.values.push(v);
            }
        }
    }

    fn joined(&self) -> String {
        self.values.join(", ")
    }
}

pub fn build(batch: &Batch, schema: &HierarchySchema) -> Table {
    let index = LineageIndex::build(batch, schema);

    // 主实体字段并集（首次出现顺序），聚合列排在最后
    let mut columns: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for entity_ref in index.entities(EntityLevel::Primary) {
        for key in entity_ref.entity.fields().keys() {
            if !AGGREGATE_COLUMNS.contains(&key.as_str()) && seen.insert(key.clone()) {
                columns.push(key.clone());
            }
        }
    }
    let field_count = columns.len();
    columns.extend(AGGREGATE_COLUMNS.iter().map(|c| c.to_string()));

    let rows = index
        .entities(EntityLevel::Primary)
        .iter()
        .enumerate()
        .map(|(primary_idx, entity_ref)| {
            let fields = entity_ref.entity.fields();
            let mut row: Vec<Value> = columns[..field_count]
                .iter()
                .map(|c| fields.get(c).cloned().unwrap_or(Value::Null))
                .collect();

            let children = index.descendants(EntityLevel::Primary, primary_idx);
            let mut subtypes = Distinct::default();
            let mut categories = Distinct::default();
            let mut total_balance = 0.0;
            let mut grandchildren = 0usize;

            for &child_idx in children {
                let Some(child) = index.get(EntityLevel::Child, child_idx) else {
                    continue;
                };
                subtypes.add(child.entity.text(&schema.subtype_field));
                total_balance += child.entity.number(&schema.balance_field).unwrap_or(0.0);

                for &gc_idx in index.descendants(EntityLevel::Child, child_idx) {
                    grandchildren += 1;
                    if let Some(gc) = index.get(EntityLevel::Grandchild, gc_idx) {
                        categories.add(gc.entity.text(&schema.category_field));
                    }
                }
            }

            row.extend([
                json!(children.len()),
                json!(subtypes.joined()),
                json!((total_balance * 100.0).round() / 100.0),
                json!(grandchildren),
                json!(categories.joined()),
            ]);
            row
        })
        .collect();

    Table::new(format!("{}_flat", schema.primary.key), columns, rows)
}
