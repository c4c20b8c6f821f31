// ==========================================
// 银行多数据集流水线 - 层级结构描述
// ==========================================
// 职责: 描述三层嵌套结构的键名、标识、外键、时间字段、输出表名
// 默认: 客户 → 账户 → 交易
// ==========================================

use crate::domain::types::EntityLevel;
use serde::{Deserialize, Serialize};

/// 单个层级的结构描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSchema {
    /// 记录中的结构键（如 "customer" / "accounts"）
    pub key: String,
    /// 拆表后的表名
    pub table: String,
    /// 标识字段
    pub id_field: String,
    /// 指向上级标识的外键字段（主实体为 None）
    #[serde(default)]
    pub parent_fk: Option<String>,
    /// 时间链字段（since / opened / occurred）
    #[serde(default)]
    pub timestamp_field: Option<String>,
}

impl LevelSchema {
    fn new(key: &str, table: &str, id_field: &str, parent_fk: Option<&str>, ts: &str) -> Self {
        Self {
            key: key.to_string(),
            table: table.to_string(),
            id_field: id_field.to_string(),
            parent_fk: parent_fk.map(str::to_string),
            timestamp_field: Some(ts.to_string()),
        }
    }
}

/// 三层结构描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySchema {
    pub primary: LevelSchema,
    pub child: LevelSchema,
    pub grandchild: LevelSchema,

    /// 子实体子类型字段（汇总表用）
    pub subtype_field: String,
    /// 子实体余额字段（汇总表用）
    pub balance_field: String,
    /// 孙实体分类字段（汇总表用）
    pub category_field: String,
}

impl HierarchySchema {
    /// 银行默认结构
    pub fn banking() -> Self {
        Self {
            primary: LevelSchema::new("customer", "customers", "cust_id", None, "customer_since"),
            child: LevelSchema::new("accounts", "accounts", "account_id", Some("cust_id"), "open_date"),
            grandchild: LevelSchema::new(
                "transactions",
                "transactions",
                "transaction_id",
                Some("account_id"),
                "transaction_date",
            ),
            subtype_field: "account_type".to_string(),
            balance_field: "current_balance".to_string(),
            category_field: "transaction_category".to_string(),
        }
    }

    pub fn level(&self, level: EntityLevel) -> &LevelSchema {
        match level {
            EntityLevel::Primary => &self.primary,
            EntityLevel::Child => &self.child,
            EntityLevel::Grandchild => &self.grandchild,
        }
    }
}

impl Default for HierarchySchema {
    fn default() -> Self {
        Self::banking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banking_schema() {
        let schema = HierarchySchema::default();
        assert_eq!(schema.level(EntityLevel::Primary).parent_fk, None);
        assert_eq!(
            schema.level(EntityLevel::Child).parent_fk.as_deref(),
            Some("cust_id")
        );
        assert_eq!(
            schema.level(EntityLevel::Grandchild).parent_fk.as_deref(),
            Some("account_id")
        );
        assert_eq!(schema.grandchild.table, "transactions");
    }

    #[test]
    fn test_schema_deserialize_custom() {
        let json = r#"{
            "primary": {"key": "patient", "table": "patients", "id_field": "pid"},
            "child": {"key": "visits", "table": "visits", "id_field": "vid", "parent_fk": "pid", "timestamp_field": "admitted"},
            "grandchild": {"key": "labs", "table": "labs", "id_field": "lid", "parent_fk": "vid"},
            "subtype_field": "ward",
            "balance_field": "cost",
            "category_field": "panel"
        }"#;

        let schema: HierarchySchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.primary.timestamp_field, None);
        assert_eq!(schema.child.timestamp_field.as_deref(), Some("admitted"));
        assert_eq!(schema.grandchild.parent_fk.as_deref(), Some("vid"));
    }
}
