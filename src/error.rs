// ==========================================
// 银行多数据集流水线 - 错误类型
// ==========================================
// 工具: thiserror 派生宏
// 职责: 结构性/配置性致命错误；规则违规不走错误通道
// ==========================================

use thiserror::Error;

/// 配置解析错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("未找到可用的输入位置（已尝试: {tried}）")]
    NoUsableSource { tried: String },

    #[error("作业参数文件读取失败 ({path}): {message}")]
    JobParamFile { path: String, message: String },

    #[error("规则文件读取失败 ({path}): {message}")]
    RulesFile { path: String, message: String },

    #[error("规则配置无效 (规则 {rule}): {message}")]
    InvalidRule { rule: String, message: String },
}

/// 流水线错误类型
#[derive(Error, Debug)]
pub enum PipelineError {
    // ===== 配置 =====
    #[error("配置解析失败: {0}")]
    ConfigResolution(#[from] ConfigError),

    // ===== 输入结构 =====
    #[error("输入文件不存在: {0}")]
    InputNotFound(String),

    #[error("输入结构非法 ({location}): {expectation}")]
    MalformedInput {
        location: String,
        expectation: String,
    },

    // ===== 拆表 =====
    #[error("空批次: 输入不含任何记录，无法拆表")]
    EmptyBatch,

    // ===== 输出 =====
    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 写入失败: {0}")]
    CsvWrite(String),

    #[error("结果序列化失败: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn malformed(location: impl Into<String>, expectation: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            location: location.into(),
            expectation: expectation.into(),
        }
    }

    /// 错误分类名（写入日志与控制台）
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ConfigResolution(_) => "ConfigResolutionError",
            PipelineError::InputNotFound(_) | PipelineError::MalformedInput { .. } => {
                "MalformedInputError"
            }
            PipelineError::EmptyBatch => "EmptyBatchError",
            PipelineError::Io(_) | PipelineError::CsvWrite(_) => "OutputError",
            PipelineError::Serialization(_) => "SerializationError",
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::CsvWrite(err.to_string())
    }
}

// 实现 From<serde_json::Error>（仅用于输出序列化；输入解析错误在加载器中显式映射）
impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

/// Result 类型别名
pub type StageResult<T> = Result<T, PipelineError>;
