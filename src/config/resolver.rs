// ==========================================
// 银行多数据集流水线 - 运行配置解析
// ==========================================
// 职责: 三个等价配置通道按固定优先级解析为 PipelineConfig
//   1. 作业参数文件（环境变量 file_name 指定）
//   2. 进程环境变量（INPUT_FILE / OUTPUT_DIR / ...）
//   3. 调用方直接参数（CLI）
// 红线: 首个给出可用输入位置的通道胜出；作业参数文件一经读取必被删除
// ==========================================

use crate::domain::types::ConfigSource;
use crate::domain::value::scalar_text;
use crate::error::ConfigError;
use crate::perf::is_true;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ==========================================
// 配置键
// ==========================================
pub mod env_keys {
    /// 作业参数文件标记（值为文件路径）
    pub const JOB_PARAM_FILE: &str = "file_name";
    pub const INPUT_FILE: &str = "INPUT_FILE";
    pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
    pub const RULES_FILE: &str = "RULES_FILE";
    pub const VERBOSE: &str = "VERBOSE";
    pub const WRITE_SUMMARY: &str = "WRITE_SUMMARY";
}

pub mod job_keys {
    pub const INPUT_FILE: &str = "input_file";
    pub const OUTPUT_DIR: &str = "output_dir";
    pub const RULES_FILE: &str = "rules_file";
    pub const JOB_NAME: &str = "job_name";
    pub const REQUEST_ID: &str = "request_id";
    pub const VERBOSE: &str = "verbose";
    pub const SUMMARY: &str = "summary";
}

pub const DEFAULT_OUTPUT_DIR: &str = "output";

// ==========================================
// EnvProvider - 环境变量访问
// ==========================================
pub trait EnvProvider {
    /// 读取变量（空白值视为未设置）
    fn var(&self, key: &str) -> Option<String>;
}

/// 进程环境
pub struct ProcessEnv;

impl EnvProvider for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// 内存环境（测试与嵌入调用）
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }
}

impl EnvProvider for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

// ==========================================
// DirectArgs / PipelineConfig
// ==========================================

/// 调用方直接参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectArgs {
    pub input_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub rules_file: Option<PathBuf>,
    pub job_name: Option<String>,
    pub verbose: bool,
    pub write_summary: bool,
}

/// 解析后的运行配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub rules_file: Option<PathBuf>,
    pub job_name: Option<String>,
    pub request_id: Option<String>,
    pub verbose: bool,
    pub write_summary: bool,
    pub source: ConfigSource,
}

impl PipelineConfig {
    fn new(source: ConfigSource, input_file: PathBuf) -> Self {
        Self {
            input_file,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            rules_file: None,
            job_name: None,
            request_id: None,
            verbose: false,
            write_summary: false,
            source,
        }
    }
}

// ==========================================
// JobParamGuard - 作业参数文件删除守卫
// ==========================================

/// 持有期间文件保留；Drop 时删除（无论运行成功与否）
#[derive(Debug)]
pub struct JobParamGuard {
    path: PathBuf,
}

impl JobParamGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JobParamGuard {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "作业参数文件已删除"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "作业参数文件删除失败"),
        }
    }
}

/// 解析结果: 配置 + （如使用）作业参数文件守卫
#[derive(Debug)]
pub struct ResolvedConfig {
    pub config: PipelineConfig,
    pub job_param: Option<JobParamGuard>,
}

// ==========================================
// ConfigResolver - 配置通道策略
// ==========================================
pub trait ConfigResolver {
    fn source(&self) -> ConfigSource;

    /// 未提供可用输入位置的通道返回 Ok(None)，交给下一个通道
    fn resolve(
        &self,
        env: &dyn EnvProvider,
        direct: &DirectArgs,
    ) -> Result<Option<ResolvedConfig>, ConfigError>;
}

/// 作业参数文件通道
pub struct JobParamFileResolver;

impl JobParamFileResolver {
    fn read(path: &Path) -> Result<Map<String, Value>, ConfigError> {
        let fail = |message: String| ConfigError::JobParamFile {
            path: path.display().to_string(),
            message,
        };

        let raw = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let raw = raw.trim_start_matches('\u{feff}');
        match serde_json::from_str::<Value>(raw).map_err(|e| fail(e.to_string()))? {
            Value::Object(map) => Ok(map),
            _ => Err(fail("作业参数必须为 JSON 对象".to_string())),
        }
    }
}

fn param_text(params: &Map<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(scalar_text)
}

fn param_flag(params: &Map<String, Value>, key: &str) -> bool {
    match params.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => is_true(s),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

impl ConfigResolver for JobParamFileResolver {
    fn source(&self) -> ConfigSource {
        ConfigSource::JobParamFile
    }

    fn resolve(
        &self,
        env: &dyn EnvProvider,
        _direct: &DirectArgs,
    ) -> Result<Option<ResolvedConfig>, ConfigError> {
        let Some(path) = env.var(env_keys::JOB_PARAM_FILE) else {
            return Ok(None);
        };

        // 开始读取即纳入守卫，任何提前返回都会删除文件
        let guard = JobParamGuard::new(&path);
        let params = Self::read(guard.path())?;

        let Some(input_file) = param_text(&params, job_keys::INPUT_FILE) else {
            warn!(path = %path, "作业参数文件未提供 input_file，尝试下一个配置通道");
            return Ok(None);
        };

        let mut config = PipelineConfig::new(self.source(), PathBuf::from(input_file));
        if let Some(dir) = param_text(&params, job_keys::OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        config.rules_file = param_text(&params, job_keys::RULES_FILE).map(PathBuf::from);
        config.job_name = param_text(&params, job_keys::JOB_NAME);
        config.request_id = param_text(&params, job_keys::REQUEST_ID);
        config.verbose = param_flag(&params, job_keys::VERBOSE);
        config.write_summary = param_flag(&params, job_keys::SUMMARY);

        Ok(Some(ResolvedConfig {
            config,
            job_param: Some(guard),
        }))
    }
}

/// 环境变量通道
pub struct EnvVarResolver;

impl ConfigResolver for EnvVarResolver {
    fn source(&self) -> ConfigSource {
        ConfigSource::Environment
    }

    fn resolve(
        &self,
        env: &dyn EnvProvider,
        _direct: &DirectArgs,
    ) -> Result<Option<ResolvedConfig>, ConfigError> {
        let Some(input_file) = env.var(env_keys::INPUT_FILE) else {
            return Ok(None);
        };

        let mut config = PipelineConfig::new(self.source(), PathBuf::from(input_file));
        if let Some(dir) = env.var(env_keys::OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        config.rules_file = env.var(env_keys::RULES_FILE).map(PathBuf::from);
        config.verbose = env.var(env_keys::VERBOSE).map(|v| is_true(&v)).unwrap_or(false);
        config.write_summary = env
            .var(env_keys::WRITE_SUMMARY)
            .map(|v| is_true(&v))
            .unwrap_or(false);

        Ok(Some(ResolvedConfig {
            config,
            job_param: None,
        }))
    }
}

/// 直接参数通道
pub struct DirectArgsResolver;

impl ConfigResolver for DirectArgsResolver {
    fn source(&self) -> ConfigSource {
        ConfigSource::DirectArgs
    }

    fn resolve(
        &self,
        _env: &dyn EnvProvider,
        direct: &DirectArgs,
    ) -> Result<Option<ResolvedConfig>, ConfigError> {
        let Some(input_file) = direct
            .input_file
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
        else {
            return Ok(None);
        };

        let mut config = PipelineConfig::new(self.source(), input_file);
        if let Some(dir) = &direct.output_dir {
            config.output_dir = dir.clone();
        }
        config.rules_file = direct.rules_file.clone();
        config.job_name = direct.job_name.clone();

        Ok(Some(ResolvedConfig {
            config,
            job_param: None,
        }))
    }
}

/// 默认通道顺序
pub fn default_resolvers() -> Vec<Box<dyn ConfigResolver>> {
    vec![
        Box::new(JobParamFileResolver),
        Box::new(EnvVarResolver),
        Box::new(DirectArgsResolver),
    ]
}

/// 解析运行配置
///
/// # 参数
/// - direct: 调用方直接参数（其 verbose / write_summary 开关总是叠加生效）
/// - env: 环境变量来源
///
/// # 返回
/// - Ok(ResolvedConfig): 首个可用通道的配置
/// - Err(NoUsableSource): 三个通道均未给出输入位置
/// - Err(JobParamFile): 作业参数文件存在但无法读取/解析
pub fn resolve_config(direct: &DirectArgs, env: &dyn EnvProvider) -> Result<ResolvedConfig, ConfigError> {
    let mut tried = Vec::new();

    for resolver in default_resolvers() {
        match resolver.resolve(env, direct)? {
            Some(mut resolved) => {
                resolved.config.verbose |= direct.verbose;
                resolved.config.write_summary |= direct.write_summary;
                info!(
                    source = %resolved.config.source,
                    input = %resolved.config.input_file.display(),
                    output = %resolved.config.output_dir.display(),
                    "运行配置已解析"
                );
                return Ok(resolved);
            }
            None => {
                debug!(source = %resolver.source(), "配置通道未提供输入位置");
                tried.push(resolver.source().to_string());
            }
        }
    }

    Err(ConfigError::NoUsableSource {
        tried: tried.join(", "),
    })
}
