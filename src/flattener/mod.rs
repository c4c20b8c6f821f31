// ==========================================
// 银行多数据集流水线 - 拆表层
// ==========================================
// 职责: 嵌套批次 → 三张独立有序表（注入外键）
// 红线: 列为同类实体字段并集（首次出现顺序）；缺失字段为空单元格
//       行顺序 = 批次遍历顺序；不做 schema 校验
// ==========================================

pub mod summary;
pub mod writer;

use crate::config::schema::{HierarchySchema, LevelSchema};
use crate::domain::record::{Batch, Entity};
use crate::domain::table::{FlattenResult, Table};
use crate::domain::value::is_blank;
use crate::error::{PipelineError, StageResult};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// 按首次出现顺序累积列的表构造器
struct TableBuilder {
    name: String,
    columns: Vec<String>,
    seen: HashSet<String>,
    rows: Vec<Map<String, Value>>,
}

impl TableBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            seen: HashSet::new(),
            rows: Vec::new(),
        }
    }

    fn register(&mut self, column: &str) {
        if self.seen.insert(column.to_string()) {
            self.columns.push(column.to_string());
        }
    }

    fn push(&mut self, row: Map<String, Value>) {
        for key in row.keys() {
            self.register(key);
        }
        self.rows.push(row);
    }

    /// 补齐必备列（仅表头的空表也带标识与外键列）
    fn finish(mut self, required: &[&str]) -> Table {
        for column in required {
            self.register(column);
        }

        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                self.columns
                    .iter()
                    .map(|c| row.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Table::new(self.name, self.columns, rows)
    }
}

fn required_columns(level: &LevelSchema) -> Vec<&str> {
    std::iter::once(level.id_field.as_str())
        .chain(level.parent_fk.as_deref())
        .collect()
}

// ==========================================
// Flattener - 拆表器
// ==========================================
pub struct Flattener {
    schema: HierarchySchema,
    summary: bool,
}

impl Flattener {
    pub fn new(schema: HierarchySchema) -> Self {
        Self {
            schema,
            summary: false,
        }
    }

    /// 是否额外生成每主实体一行的汇总表
    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.summary = enabled;
        self
    }

    /// 拆表
    ///
    /// # 返回
    /// - Err(EmptyBatch): 批次不含任何记录
    /// - Ok: 子/孙实体为零时输出仅表头的表
    #[instrument(skip(self, batch), fields(records = batch.len()))]
    pub fn flatten(&self, batch: &Batch) -> StageResult<FlattenResult> {
        if batch.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        let schema = &self.schema;
        let mut primary = TableBuilder::new(&schema.primary.table);
        let mut child = TableBuilder::new(&schema.child.table);
        let mut grandchild = TableBuilder::new(&schema.grandchild.table);

        for (record_idx, record) in batch.records().iter().enumerate() {
            let primary_entity = record.primary();
            primary.push(primary_entity.fields().clone());

            for entity in record.children() {
                child.push(self.child_row(record_idx, primary_entity, entity));
            }
            for entity in record.grandchildren() {
                grandchild.push(self.grandchild_row(record_idx, entity));
            }
        }

        let mut result = FlattenResult::new(
            primary.finish(&required_columns(&schema.primary)),
            child.finish(&required_columns(&schema.child)),
            grandchild.finish(&required_columns(&schema.grandchild)),
        );

        if self.summary {
            result = result.with_summary(summary::build(batch, schema));
        }

        let counts = result.row_counts();
        info!(
            primary = counts.primary,
            child = counts.child,
            grandchild = counts.grandchild,
            "拆表完成"
        );
        Ok(result)
    }

    /// 子实体行: 外键缺失时从所属主实体注入
    fn child_row(&self, record_idx: usize, primary: &Entity, entity: &Entity) -> Map<String, Value> {
        let mut row = entity.fields().clone();
        if let Some(fk) = self.schema.child.parent_fk.as_deref() {
            if is_blank(row.get(fk)) {
                warn!(
                    record = record_idx,
                    entity_id = entity.id(),
                    fk = fk,
                    inherited = primary.id(),
                    "子实体缺少外键，已从主实体注入"
                );
                row.insert(fk.to_string(), Value::String(primary.id().to_string()));
            }
        }
        row
    }

    /// 孙实体行: 外键缺失时保留空单元格
    fn grandchild_row(&self, record_idx: usize, entity: &Entity) -> Map<String, Value> {
        let row = entity.fields().clone();
        if let Some(fk) = self.schema.grandchild.parent_fk.as_deref() {
            if is_blank(row.get(fk)) {
                warn!(
                    record = record_idx,
                    entity_id = entity.id(),
                    fk = fk,
                    "孙实体缺少外键，输出空单元格"
                );
            }
        }
        row
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(HierarchySchema::default())
    }
}

/// 使用默认银行结构拆表
pub fn flatten(batch: &Batch) -> StageResult<FlattenResult> {
    Flattener::default().flatten(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EntityLevel;
    use crate::loader::{load, InputSource};
    use serde_json::json;

    fn batch(value: Value) -> Batch {
        let text = value.to_string();
        load(InputSource::Bytes(text.as_bytes())).unwrap()
    }

    #[test]
    fn test_union_columns_first_seen_order() {
        let b = batch(json!([
            {"customer": {"cust_id": "C1", "name": "Ada"},
             "accounts": [{"account_id": "A1", "cust_id": "C1", "type": "Checking"}],
             "transactions": []},
            {"customer": {"cust_id": "C2", "segment": "VIP", "name": "Bob"},
             "accounts": [{"account_id": "A2", "cust_id": "C2", "limit": 100}],
             "transactions": []}
        ]));

        let result = flatten(&b).unwrap();
        let customers = result.table(EntityLevel::Primary);
        assert_eq!(customers.columns(), ["cust_id", "name", "segment"]);
        assert_eq!(customers.cell(0, "segment").as_deref(), Some(""));

        let accounts = result.table(EntityLevel::Child);
        assert_eq!(accounts.columns(), ["account_id", "cust_id", "type", "limit"]);
        assert_eq!(accounts.cell(1, "limit").as_deref(), Some("100"));
    }

    #[test]
    fn test_empty_batch_rejected() {
        let b = batch(json!([]));
        assert!(matches!(flatten(&b), Err(PipelineError::EmptyBatch)));
    }

    #[test]
    fn test_header_only_tables() {
        let b = batch(json!([
            {"customer": {"cust_id": "C1"}, "accounts": [], "transactions": []}
        ]));

        let result = flatten(&b).unwrap();
        let transactions = result.table(EntityLevel::Grandchild);
        assert_eq!(transactions.row_count(), 0);
        assert_eq!(transactions.columns(), ["transaction_id", "account_id"]);
    }

    #[test]
    fn test_missing_child_fk_injected_grandchild_left_empty() {
        let b = batch(json!([
            {"customer": {"cust_id": "C1"},
             "accounts": [{"account_id": "A1"}],
             "transactions": [{"transaction_id": "T1", "amount": 5}]}
        ]));

        let result = flatten(&b).unwrap();
        assert_eq!(result.table(EntityLevel::Child).cell(0, "cust_id").as_deref(), Some("C1"));
        assert_eq!(
            result.table(EntityLevel::Grandchild).cell(0, "account_id").as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_rows_follow_traversal_order() {
        let b = batch(json!([
            {"customer": {"cust_id": "C2"},
             "accounts": [{"account_id": "B", "cust_id": "C2"}, {"account_id": "A", "cust_id": "C2"}],
             "transactions": []},
            {"customer": {"cust_id": "C1"},
             "accounts": [{"account_id": "C", "cust_id": "C1"}],
             "transactions": []}
        ]));

        let result = flatten(&b).unwrap();
        let accounts = result.table(EntityLevel::Child);
        let ids: Vec<String> = (0..accounts.row_count())
            .filter_map(|i| accounts.cell(i, "account_id"))
            .collect();
        assert_eq!(ids, ["B", "A", "C"]);
    }
}
