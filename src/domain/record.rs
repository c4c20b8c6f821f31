// ==========================================
// 银行多数据集流水线 - 批次/记录/实体
// ==========================================
// 职责: 加载后的不可变嵌套结构
// 红线: 创建后不做任何修改
// ==========================================

use crate::domain::types::EntityLevel;
use crate::domain::value::{numeric, scalar_text};
use serde_json::{Map, Value};

// ==========================================
// Entity - 单个实体（字段保持源顺序）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: String,                // 标识（PK0 / PK1 / PK2）
    fields: Map<String, Value>, // 全部字段，按源顺序
}

impl Entity {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// 字段的文本视图（缺失/空白/非标量为 None）
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(scalar_text)
    }

    /// 字段的数值视图
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(numeric)
    }
}

// ==========================================
// Record - 一个主实体及其嵌套子/孙实体
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    primary: Entity,
    children: Vec<Entity>,
    grandchildren: Vec<Entity>,
}

impl Record {
    pub fn new(primary: Entity, children: Vec<Entity>, grandchildren: Vec<Entity>) -> Self {
        Self {
            primary,
            children,
            grandchildren,
        }
    }

    pub fn primary(&self) -> &Entity {
        &self.primary
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    pub fn grandchildren(&self) -> &[Entity] {
        &self.grandchildren
    }

    /// 指定层级的实体切片（主实体为单元素切片）
    pub fn entities(&self, level: EntityLevel) -> &[Entity] {
        match level {
            EntityLevel::Primary => std::slice::from_ref(&self.primary),
            EntityLevel::Child => &self.children,
            EntityLevel::Grandchild => &self.grandchildren,
        }
    }
}

// ==========================================
// Batch - 一次运行处理的有序记录集合
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 指定层级的实体总数
    pub fn count(&self, level: EntityLevel) -> usize {
        self.records.iter().map(|r| r.entities(level).len()).sum()
    }
}
