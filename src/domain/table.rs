// ==========================================
// 银行多数据集流水线 - 扁平表模型
// ==========================================
// 职责: Table（列 + 行）与 FlattenResult（三张独立表 + 可选汇总表）
// 红线: 行顺序即批次遍历顺序；单元格保留原始 JSON 值，写出时再渲染
// ==========================================

use crate::domain::report::EntityCounts;
use crate::domain::types::EntityLevel;
use crate::domain::value::render_cell;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// 指定行列的单元格文本
    pub fn cell(&self, row: usize, column: &str) -> Option<String> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col)).map(render_cell)
    }

    /// 渲染后的行（CSV 写出用）
    pub fn rendered_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
    }

    /// 行转为 JSON 对象（列顺序保持）
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

// ==========================================
// FlattenResult - 拆表结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenResult {
    primary: Table,
    child: Table,
    grandchild: Table,
    summary: Option<Table>,
}

impl FlattenResult {
    pub fn new(primary: Table, child: Table, grandchild: Table) -> Self {
        Self {
            primary,
            child,
            grandchild,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: Table) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn table(&self, level: EntityLevel) -> &Table {
        match level {
            EntityLevel::Primary => &self.primary,
            EntityLevel::Child => &self.child,
            EntityLevel::Grandchild => &self.grandchild,
        }
    }

    pub fn summary(&self) -> Option<&Table> {
        self.summary.as_ref()
    }

    /// 三张主表（层级顺序）
    pub fn tables(&self) -> [&Table; 3] {
        [&self.primary, &self.child, &self.grandchild]
    }

    pub fn row_counts(&self) -> EntityCounts {
        EntityCounts {
            primary: self.primary.row_count(),
            child: self.child.row_count(),
            grandchild: self.grandchild.row_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> Table {
        Table::new(
            "accounts",
            vec!["account_id".to_string(), "balance".to_string(), "tags".to_string()],
            vec![
                vec![json!("A1"), json!(10.5), json!(["x", "y"])],
                vec![json!("A2"), Value::Null, Value::Null],
            ],
        )
    }

    #[test]
    fn test_cells_rendered_on_demand() {
        let t = table();
        assert_eq!(t.cell(0, "balance").as_deref(), Some("10.5"));
        assert_eq!(t.cell(0, "tags").as_deref(), Some(r#"["x","y"]"#));
        assert_eq!(t.cell(1, "balance").as_deref(), Some(""));
        assert_eq!(t.cell(0, "missing"), None);
    }

    #[test]
    fn test_to_records_keeps_column_order() {
        let records = table().to_records();
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["account_id", "balance", "tags"]);
    }
}
