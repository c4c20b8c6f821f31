// ==========================================
// 银行多数据集流水线 - 加载层
// ==========================================
// 职责: 外部嵌套 JSON → 内存批次
// 支持: 文件路径 / 内存字节流
// ==========================================

pub mod json_loader;

pub use json_loader::{BatchLoader, InputSource, JsonBatchLoader};

use crate::domain::record::Batch;
use crate::error::StageResult;

/// 使用默认银行结构加载批次
pub fn load(source: InputSource<'_>) -> StageResult<Batch> {
    JsonBatchLoader::default().load(source)
}
