// ==========================================
// 银行多数据集流水线 - 运行编排器
// ==========================================
// 状态机: CONFIGURED → LOADED → VALIDATED → FLATTENED（终态）
//         任一非终态 → FAILED（终态）
// 顺序: 加载 → 校验 → 拆表 → 写表 → 写结果文档
// 红线: 校验不通过不中止拆表；加载/拆表/写出异常直接进入 FAILED
// ==========================================

use crate::config::resolver::{resolve_config, DirectArgs, EnvProvider, JobParamGuard, PipelineConfig, ProcessEnv};
use crate::config::rules::RuleSet;
use crate::domain::pipeline::{PipelineResult, StageTimings};
use crate::domain::types::RunState;
use crate::error::PipelineError;
use crate::flattener::writer::CsvTableWriter;
use crate::flattener::Flattener;
use crate::loader::{BatchLoader, InputSource, JsonBatchLoader};
use crate::perf::StageTimer;
use crate::reporter;
use crate::validator::{ValidationOptions, Validator};
use chrono::Utc;
use std::cell::Cell;
use thiserror::Error;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// 致命中止: 失败前所处状态 + 原始错误
#[derive(Error, Debug)]
#[error("流水线在 {failed_from} 状态中止 [{}]: {error}", .error.kind())]
pub struct PipelineAbort {
    pub failed_from: RunState,
    #[source]
    pub error: PipelineError,
}

impl PipelineAbort {
    /// 中止后的终态
    pub fn state(&self) -> RunState {
        RunState::Failed
    }

    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

// ==========================================
// PipelineOrchestrator - 编排器
// ==========================================
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    state: RunState,
    loader: JsonBatchLoader,
    validator: Validator,
    flattener: Flattener,
    // 运行结束（含中止）时随编排器一起释放，删除作业参数文件
    job_param: Option<JobParamGuard>,
}

impl PipelineOrchestrator {
    /// 解析配置并装配各阶段组件
    ///
    /// # 参数
    /// - direct: 调用方直接参数
    /// - env: 环境变量来源（含作业参数文件标记）
    ///
    /// # 返回
    /// - Err(PipelineAbort): 无可用配置通道 / 规则文件无效
    pub fn configure(direct: &DirectArgs, env: &dyn EnvProvider) -> Result<Self, PipelineAbort> {
        let resolved = resolve_config(direct, env).map_err(|e| PipelineAbort {
            failed_from: RunState::Configured,
            error: e.into(),
        })?;

        let mut orchestrator = Self::from_config(resolved.config).map_err(|e| PipelineAbort {
            failed_from: RunState::Configured,
            error: e,
        })?;
        orchestrator.job_param = resolved.job_param;
        Ok(orchestrator)
    }

    /// 由已解析配置装配（规则文件在此加载）
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let rules = match &config.rules_file {
            Some(path) => RuleSet::load(path)?,
            None => RuleSet::default(),
        };
        let validator = Validator::new(&rules)?;
        let loader = JsonBatchLoader::new(rules.schema.clone());
        let flattener = Flattener::new(rules.schema.clone()).with_summary(config.write_summary);

        debug!(
            business_rules = rules.business.len(),
            format_rules = rules.format.len(),
            "规则表已装配"
        );

        Ok(Self {
            config,
            state: RunState::Configured,
            loader,
            validator,
            flattener,
            job_param: None,
        })
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.validator = self.validator.with_options(options);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "非法状态迁移 {} → {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "状态迁移");
        self.state = next;
    }

    fn abort(&mut self, error: PipelineError) -> PipelineAbort {
        let failed_from = self.state;
        self.transition(RunState::Failed);
        error!(
            failed_from = %failed_from,
            kind = error.kind(),
            error = %error,
            "流水线中止"
        );
        PipelineAbort { failed_from, error }
    }

    /// 执行流水线
    ///
    /// # 返回
    /// - Ok(PipelineResult): 运行完成（校验可能未通过，见 exit_signal）
    /// - Err(PipelineAbort): 结构性错误中止，不写结果文档
    #[instrument(skip(self), fields(input = %self.config.input_file.display(), source = %self.config.source))]
    pub fn run(mut self) -> Result<PipelineResult, PipelineAbort> {
        let run_id = Uuid::new_v4();
        let timestamp = Utc::now();
        info!(run_id = %run_id, "流水线启动");

        let load_ms = Cell::new(0);
        let validate_ms = Cell::new(0);
        let flatten_ms = Cell::new(0);
        let write_ms = Cell::new(0);

        // ===== 加载 =====
        let loaded = {
            let _timer = StageTimer::new("load", &load_ms);
            self.loader.load(InputSource::Path(self.config.input_file.as_path()))
        };
        let batch = loaded.map_err(|e| self.abort(e))?;
        self.transition(RunState::Loaded);

        // ===== 校验（违规只记录不中止）=====
        let report = {
            let _timer = StageTimer::new("validate", &validate_ms);
            self.validator.validate(&batch)
        };
        self.transition(RunState::Validated);

        // ===== 拆表 =====
        let flattened = {
            let _timer = StageTimer::new("flatten", &flatten_ms);
            self.flattener.flatten(&batch)
        };
        let flat = flattened.map_err(|e| self.abort(e))?;
        drop(batch);

        // ===== 写表 =====
        let written = {
            let _timer = StageTimer::new("write", &write_ms);
            CsvTableWriter::new(&self.config.output_dir).write_all(&flat)
        };
        let outputs = written.map_err(|e| self.abort(e))?;
        drop(flat);

        let result_path = reporter::result_path(&self.config.output_dir);
        let result = PipelineResult {
            run_id,
            timestamp,
            job_name: self.config.job_name.clone(),
            request_id: self.config.request_id.clone(),
            config_source: self.config.source,
            input_file: self.config.input_file.display().to_string(),
            output_dir: self.config.output_dir.display().to_string(),
            state: RunState::Flattened,
            validation: report,
            flatten: outputs,
            timings: StageTimings {
                load_ms: load_ms.get(),
                validate_ms: validate_ms.get(),
                flatten_ms: flatten_ms.get(),
                write_ms: write_ms.get(),
            },
            result_file: Some(result_path.display().to_string()),
        };

        // ===== 结果文档 =====
        reporter::write_result_json(&result, &result_path).map_err(|e| self.abort(e))?;
        self.transition(RunState::Flattened);

        info!(
            run_id = %run_id,
            passed = result.passed(),
            errors = result.validation.error_count(),
            warnings = result.validation.warning_count(),
            total_ms = result.timings.total_ms(),
            "流水线完成"
        );
        Ok(result)
    }
}

/// 使用进程环境解析配置并运行
pub fn run_pipeline(direct: &DirectArgs) -> Result<PipelineResult, PipelineAbort> {
    run_with_env(direct, &ProcessEnv)
}

/// 使用指定环境解析配置并运行
pub fn run_with_env(direct: &DirectArgs, env: &dyn EnvProvider) -> Result<PipelineResult, PipelineAbort> {
    PipelineOrchestrator::configure(direct, env)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolver::{env_keys, MapEnv};
    use crate::domain::types::ExitSignal;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn direct(input: PathBuf, output: PathBuf) -> DirectArgs {
        DirectArgs {
            input_file: Some(input),
            output_dir: Some(output),
            ..DirectArgs::default()
        }
    }

    #[test]
    fn test_configure_without_source_fails_fast() {
        let abort = PipelineOrchestrator::configure(&DirectArgs::default(), &MapEnv::new())
            .err()
            .unwrap();

        assert_eq!(abort.failed_from, RunState::Configured);
        assert_eq!(abort.state(), RunState::Failed);
        assert_eq!(abort.kind(), "ConfigResolutionError");
    }

    #[test]
    fn test_missing_input_aborts_at_load() {
        let dir = tempdir().unwrap();
        let args = direct(dir.path().join("absent.json"), dir.path().join("out"));

        let orchestrator = PipelineOrchestrator::configure(&args, &MapEnv::new()).unwrap();
        assert_eq!(orchestrator.state(), RunState::Configured);

        let abort = orchestrator.run().unwrap_err();
        assert_eq!(abort.failed_from, RunState::Configured);
        assert!(matches!(abort.error, PipelineError::InputNotFound(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_completed_run_writes_outputs() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("batch.json");
        std::fs::write(
            &input,
            r#"[{"customer": {"cust_id": "C1"},
                 "accounts": [{"account_id": "A1", "cust_id": "C1"}],
                 "transactions": [{"transaction_id": "T1", "account_id": "A1"}]}]"#,
        )
        .unwrap();
        let out = dir.path().join("out");

        let result = run_with_env(&direct(input, out.clone()), &MapEnv::new()).unwrap();

        assert_eq!(result.state, RunState::Flattened);
        // 缺少必填字段 → 校验不通过但运行完成
        assert_eq!(result.exit_signal(), ExitSignal::ValidationFailed);
        assert_eq!(result.flatten.row_counts.grandchild, 1);
        assert!(out.join("csv/customers.csv").exists());
        assert!(out.join(reporter::RESULT_FILE_NAME).exists());
    }

    #[test]
    fn test_invalid_rules_file_is_config_error() {
        let dir = tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        std::fs::write(&rules, "{ broken").unwrap();
        let env = MapEnv::new()
            .with(env_keys::INPUT_FILE, "batch.json")
            .with(env_keys::RULES_FILE, rules.display().to_string());

        let abort = PipelineOrchestrator::configure(&DirectArgs::default(), &env)
            .err()
            .unwrap();
        assert_eq!(abort.kind(), "ConfigResolutionError");
    }
}
