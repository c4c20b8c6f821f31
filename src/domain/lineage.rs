// ==========================================
// 银行多数据集流水线 - 批次级血缘索引
// ==========================================
// 职责: 实体平铺（arena）+ 标识索引，支持跨记录外键 O(1) 解析
// 红线: 外键解析按整个批次进行，不限于同一条记录
// ==========================================

use crate::config::schema::HierarchySchema;
use crate::domain::record::{Batch, Entity};
use crate::domain::report::EntityCounts;
use crate::domain::types::EntityLevel;
use std::collections::HashMap;

/// 平铺后的实体引用
#[derive(Debug, Clone)]
pub struct EntityRef<'a> {
    pub level: EntityLevel,
    pub record: usize,            // 所在记录下标
    pub position: usize,          // 记录内下标
    pub entity: &'a Entity,
    pub parent_key: Option<String>, // 外键值（主实体为 None）
}

impl<'a> EntityRef<'a> {
    pub fn id(&self) -> &'a str {
        self.entity.id()
    }
}

/// 外键解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Missing,          // 无匹配标识
    Unique(usize),    // 唯一匹配（上级层级 arena 下标）
    Ambiguous(usize), // 匹配到多个同名标识（数量）
}

#[derive(Debug, Default)]
struct LevelArena<'a> {
    entities: Vec<EntityRef<'a>>,
    ids: HashMap<&'a str, Vec<usize>>,
}

impl<'a> LevelArena<'a> {
    fn push(&mut self, entity_ref: EntityRef<'a>) {
        let idx = self.entities.len();
        self.ids.entry(entity_ref.id()).or_default().push(idx);
        self.entities.push(entity_ref);
    }

    fn resolve(&self, key: &str) -> Resolution {
        match self.ids.get(key).map(Vec::as_slice) {
            None | Some([]) => Resolution::Missing,
            Some([only]) => Resolution::Unique(*only),
            Some(many) => Resolution::Ambiguous(many.len()),
        }
    }
}

// ==========================================
// LineageIndex - 血缘索引
// ==========================================
#[derive(Debug)]
pub struct LineageIndex<'a> {
    primary: LevelArena<'a>,
    child: LevelArena<'a>,
    grandchild: LevelArena<'a>,
    // 上级 arena 下标 → 唯一解析到它的下级 arena 下标（按遍历顺序）
    children_of: HashMap<usize, Vec<usize>>,
    grandchildren_of: HashMap<usize, Vec<usize>>,
}

impl<'a> LineageIndex<'a> {
    /// 单次遍历构建索引
    pub fn build(batch: &'a Batch, schema: &HierarchySchema) -> Self {
        let mut index = Self {
            primary: LevelArena::default(),
            child: LevelArena::default(),
            grandchild: LevelArena::default(),
            children_of: HashMap::new(),
            grandchildren_of: HashMap::new(),
        };

        for (record_idx, record) in batch.records().iter().enumerate() {
            for level in EntityLevel::ALL {
                let fk_field = schema.level(level).parent_fk.as_deref();
                for (position, entity) in record.entities(level).iter().enumerate() {
                    let parent_key = fk_field.and_then(|f| entity.text(f));
                    index.arena_mut(level).push(EntityRef {
                        level,
                        record: record_idx,
                        position,
                        entity,
                        parent_key,
                    });
                }
            }
        }

        // 第二步: 建立唯一解析的父 → 子映射
        for idx in 0..index.child.entities.len() {
            if let Some(parent) = index.unique_parent(EntityLevel::Child, idx) {
                index.children_of.entry(parent).or_default().push(idx);
            }
        }
        for idx in 0..index.grandchild.entities.len() {
            if let Some(parent) = index.unique_parent(EntityLevel::Grandchild, idx) {
                index.grandchildren_of.entry(parent).or_default().push(idx);
            }
        }

        index
    }

    fn arena(&self, level: EntityLevel) -> &LevelArena<'a> {
        match level {
            EntityLevel::Primary => &self.primary,
            EntityLevel::Child => &self.child,
            EntityLevel::Grandchild => &self.grandchild,
        }
    }

    fn arena_mut(&mut self, level: EntityLevel) -> &mut LevelArena<'a> {
        match level {
            EntityLevel::Primary => &mut self.primary,
            EntityLevel::Child => &mut self.child,
            EntityLevel::Grandchild => &mut self.grandchild,
        }
    }

    /// 指定层级的全部实体（批次遍历顺序）
    pub fn entities(&self, level: EntityLevel) -> &[EntityRef<'a>] {
        &self.arena(level).entities
    }

    pub fn get(&self, level: EntityLevel, idx: usize) -> Option<&EntityRef<'a>> {
        self.arena(level).entities.get(idx)
    }

    /// 在指定层级中查找标识
    pub fn lookup(&self, level: EntityLevel, id: &str) -> Resolution {
        self.arena(level).resolve(id)
    }

    /// 解析实体的外键（主实体或外键缺失时为 None）
    pub fn resolve_parent(&self, level: EntityLevel, idx: usize) -> Option<Resolution> {
        let parent_level = level.parent()?;
        let key = self.get(level, idx)?.parent_key.as_deref()?;
        Some(self.lookup(parent_level, key))
    }

    /// 唯一解析到的上级 arena 下标
    pub fn unique_parent(&self, level: EntityLevel, idx: usize) -> Option<usize> {
        match self.resolve_parent(level, idx)? {
            Resolution::Unique(parent) => Some(parent),
            _ => None,
        }
    }

    /// 唯一解析到指定上级的下级实体下标（遍历顺序）
    pub fn descendants(&self, parent_level: EntityLevel, parent_idx: usize) -> &[usize] {
        let map = match parent_level {
            EntityLevel::Primary => &self.children_of,
            EntityLevel::Child => &self.grandchildren_of,
            EntityLevel::Grandchild => return &[],
        };
        map.get(&parent_idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entity_counts(&self) -> EntityCounts {
        EntityCounts {
            primary: self.primary.entities.len(),
            child: self.child.entities.len(),
            grandchild: self.grandchild.entities.len(),
        }
    }
}
