// ==========================================
// 银行多数据集流水线 - JSON 批次加载器
// ==========================================
// 职责: 读取嵌套 JSON 批次、编码规范化、结构完整性检查
// 红线: 不校验字段取值（交给校验器）
// ==========================================

use crate::config::schema::{HierarchySchema, LevelSchema};
use crate::domain::record::{Batch, Entity, Record};
use crate::domain::value::scalar_text;
use crate::error::{PipelineError, StageResult};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, instrument};

/// UTF-8 BOM
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 生成服务的问答信封字段
const ENVELOPE_KEY: &str = "solution";

/// 输入来源
#[derive(Debug, Clone, Copy)]
pub enum InputSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

impl InputSource<'_> {
    fn label(&self) -> String {
        match self {
            InputSource::Path(p) => p.display().to_string(),
            InputSource::Bytes(_) => "<memory>".to_string(),
        }
    }
}

// ==========================================
// BatchLoader Trait
// ==========================================
pub trait BatchLoader {
    /// 解析输入为批次
    ///
    /// # 返回
    /// - Ok(Batch): 结构完整的批次（可以为空）
    /// - Err(MalformedInput): 非 JSON 数组 / 缺少结构键 / 缺少标识
    fn load(&self, source: InputSource<'_>) -> StageResult<Batch>;
}

// ==========================================
// JsonBatchLoader 实现
// ==========================================
pub struct JsonBatchLoader {
    schema: HierarchySchema,
}

impl JsonBatchLoader {
    pub fn new(schema: HierarchySchema) -> Self {
        Self { schema }
    }

    fn read_bytes(&self, source: InputSource<'_>) -> StageResult<Vec<u8>> {
        match source {
            InputSource::Path(path) => {
                // 检查文件存在
                if !path.exists() {
                    return Err(PipelineError::InputNotFound(path.display().to_string()));
                }
                // 目录 / 权限不足等读取失败属于输入问题，不归为输出错误
                std::fs::read(path).map_err(|e| {
                    PipelineError::malformed(path.display().to_string(), format!("输入必须为可读文件: {}", e))
                })
            }
            InputSource::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }

    fn decode(&self, label: &str, bytes: &[u8]) -> StageResult<Value> {
        // 去除 BOM
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let text = std::str::from_utf8(bytes).map_err(|e| {
            PipelineError::malformed(
                format!("{} 字节 {}", label, e.valid_up_to()),
                "输入必须为 UTF-8 编码",
            )
        })?;

        serde_json::from_str(text).map_err(|e| {
            PipelineError::malformed(
                format!("{}:{}:{}", label, e.line(), e.column()),
                format!("输入必须为合法 JSON: {}", e),
            )
        })
    }

    /// 解开生成服务的 {"solution": "<json>"} 信封
    fn unwrap_envelope(&self, location: &str, element: Value) -> StageResult<Value> {
        let is_envelope = match &element {
            Value::Object(obj) => {
                !obj.contains_key(&self.schema.primary.key)
                    && matches!(obj.get(ENVELOPE_KEY), Some(Value::String(_)))
            }
            _ => false,
        };

        if !is_envelope {
            return Ok(element);
        }

        let text = element
            .get(ENVELOPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default();

        debug!(location = %location, "解开 solution 信封");
        serde_json::from_str(text).map_err(|e| {
            PipelineError::malformed(
                format!("{}.{}", location, ENVELOPE_KEY),
                format!("信封内容必须为合法 JSON 记录: {}", e),
            )
        })
    }

    fn parse_record(&self, location: &str, element: Value) -> StageResult<Record> {
        let element = self.unwrap_envelope(location, element)?;

        let Value::Object(mut obj) = element else {
            return Err(PipelineError::malformed(location, "记录必须为 JSON 对象"));
        };

        let primary_schema = &self.schema.primary;
        let primary = match obj.remove(&primary_schema.key) {
            Some(Value::Object(fields)) => {
                let loc = format!("{}.{}", location, primary_schema.key);
                self.parse_entity(&loc, primary_schema, fields)?
            }
            Some(_) => {
                return Err(PipelineError::malformed(
                    location,
                    format!("结构键 {} 必须为对象", primary_schema.key),
                ))
            }
            None => {
                return Err(PipelineError::malformed(
                    location,
                    format!("缺少结构键 {}", primary_schema.key),
                ))
            }
        };

        let children = self.parse_entity_list(location, &self.schema.child, &mut obj)?;
        let grandchildren = self.parse_entity_list(location, &self.schema.grandchild, &mut obj)?;

        Ok(Record::new(primary, children, grandchildren))
    }

    fn parse_entity_list(
        &self,
        location: &str,
        level: &LevelSchema,
        obj: &mut Map<String, Value>,
    ) -> StageResult<Vec<Entity>> {
        let items = match obj.remove(&level.key) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(PipelineError::malformed(
                    location,
                    format!("结构键 {} 必须为数组", level.key),
                ))
            }
            None => {
                return Err(PipelineError::malformed(
                    location,
                    format!("缺少结构键 {}", level.key),
                ))
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                let loc = format!("{}.{}[{}]", location, level.key, idx);
                match item {
                    Value::Object(fields) => self.parse_entity(&loc, level, fields),
                    _ => Err(PipelineError::malformed(loc, "实体必须为 JSON 对象")),
                }
            })
            .collect()
    }

    fn parse_entity(
        &self,
        location: &str,
        level: &LevelSchema,
        fields: Map<String, Value>,
    ) -> StageResult<Entity> {
        let id = fields
            .get(&level.id_field)
            .and_then(scalar_text)
            .ok_or_else(|| {
                PipelineError::malformed(location, format!("缺少标识字段 {}", level.id_field))
            })?;

        Ok(Entity::new(id, fields))
    }
}

impl Default for JsonBatchLoader {
    fn default() -> Self {
        Self::new(HierarchySchema::default())
    }
}

impl BatchLoader for JsonBatchLoader {
    #[instrument(skip(self, source), fields(source = %source.label()))]
    fn load(&self, source: InputSource<'_>) -> StageResult<Batch> {
        let label = source.label();
        let bytes = self.read_bytes(source)?;
        let root = self.decode(&label, &bytes)?;

        let Value::Array(elements) = root else {
            return Err(PipelineError::malformed(label, "顶层必须为 JSON 数组"));
        };

        let records = elements
            .into_iter()
            .enumerate()
            .map(|(idx, element)| {
                let location = format!("{} 记录[{}]", label, idx);
                self.parse_record(&location, element)
            })
            .collect::<StageResult<Vec<_>>>()?;

        let batch = Batch::new(records);
        info!(records = batch.len(), "批次加载完成");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EntityLevel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_str(text: &str) -> StageResult<Batch> {
        JsonBatchLoader::default().load(InputSource::Bytes(text.as_bytes()))
    }

    fn expect_malformed(result: StageResult<Batch>, needle: &str) {
        match result {
            Err(PipelineError::MalformedInput {
                location,
                expectation,
            }) => assert!(
                location.contains(needle) || expectation.contains(needle),
                "unexpected context: {} / {}",
                location,
                expectation
            ),
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_load_valid_batch() {
        let batch = load_str(
            r#"[{"customer": {"cust_id": "C1", "first_name": "Ada"},
                 "accounts": [{"account_id": "A1", "cust_id": "C1"}],
                 "transactions": [{"transaction_id": "T1", "account_id": "A1"}]}]"#,
        )
        .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records()[0].primary().id(), "C1");
        assert_eq!(batch.count(EntityLevel::Grandchild), 1);
    }

    #[test]
    fn test_empty_array_is_structurally_valid() {
        let batch = load_str("[]").unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_not_an_array() {
        expect_malformed(load_str(r#"{"customer": {}}"#), "顶层必须为 JSON 数组");
    }

    #[test]
    fn test_invalid_json() {
        expect_malformed(load_str("[{"), "合法 JSON");
    }

    #[test]
    fn test_missing_structure_key() {
        expect_malformed(
            load_str(r#"[{"customer": {"cust_id": "C1"}, "accounts": []}]"#),
            "transactions",
        );
    }

    #[test]
    fn test_missing_identifier() {
        expect_malformed(
            load_str(
                r#"[{"customer": {"cust_id": "C1"},
                     "accounts": [{"cust_id": "C1"}],
                     "transactions": []}]"#,
            ),
            "accounts[0]",
        );
    }

    #[test]
    fn test_numeric_identifier_accepted() {
        let batch = load_str(
            r#"[{"customer": {"cust_id": 1001}, "accounts": [], "transactions": []}]"#,
        )
        .unwrap();
        assert_eq!(batch.records()[0].primary().id(), "1001");
    }

    #[test]
    fn test_solution_envelope_unwrapped() {
        let inner = r#"{"customer": {"cust_id": "C7"}, "accounts": [], "transactions": []}"#;
        let outer = serde_json::json!([{ "question": "q", "solution": inner }]).to_string();

        let batch = load_str(&outer).unwrap();
        assert_eq!(batch.records()[0].primary().id(), "C7");
    }

    #[test]
    fn test_bad_envelope() {
        let outer = serde_json::json!([{ "solution": "not json" }]).to_string();
        expect_malformed(load_str(&outer), "solution");
    }

    #[test]
    fn test_bom_and_field_order_preserved() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(UTF8_BOM).unwrap();
        write!(
            temp_file,
            r#"[{{"customer": {{"zeta": 1, "cust_id": "C1", "alpha": 2}}, "accounts": [], "transactions": []}}]"#
        )
        .unwrap();

        let batch = JsonBatchLoader::default()
            .load(InputSource::Path(temp_file.path()))
            .unwrap();

        let keys: Vec<&String> = batch.records()[0].primary().fields().keys().collect();
        assert_eq!(keys, ["zeta", "cust_id", "alpha"]);
    }

    #[test]
    fn test_invalid_utf8() {
        let result = JsonBatchLoader::default().load(InputSource::Bytes(&[b'[', 0xFF, b']']));
        expect_malformed(result, "UTF-8");
    }

    #[test]
    fn test_missing_file() {
        let result = JsonBatchLoader::default().load(InputSource::Path(Path::new("no_such_batch.json")));
        assert!(matches!(result, Err(PipelineError::InputNotFound(_))));
    }

    #[test]
    fn test_unreadable_path_is_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonBatchLoader::default().load(InputSource::Path(dir.path()));

        let err = result.unwrap_err();
        assert_eq!(err.kind(), "MalformedInputError");
        assert!(err.to_string().contains("可读文件"));
    }
}
