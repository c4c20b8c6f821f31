// ==========================================
// 运行配置解析集成测试
// ==========================================
// 测试目标: 作业参数文件 > 环境变量 > 直接参数 的优先级
//           以及作业参数文件在运行结束后的清理
// ==========================================


use bank_multiset_pipeline::config::resolver::env_keys;
use bank_multiset_pipeline::config::{resolve_config, DirectArgs, MapEnv};
use bank_multiset_pipeline::domain::{ConfigSource, RunState};
use bank_multiset_pipeline::pipeline::{run_with_env, PipelineOrchestrator};
use serde_json::json;
use std::fs;
use tempfile::tempdir;
use test_helpers::{direct_args, scenario_a_batch, write_batch};

#[test]
fn test_environment_overrides_direct_args() {
    let dir = tempdir().unwrap();
    let input = write_batch(dir.path(), &scenario_a_batch());
    let env_out = dir.path().join("env_out");
    let direct_out = dir.path().join("direct_out");

    let env = MapEnv::new()
        .with(env_keys::INPUT_FILE, input.display().to_string())
        .with(env_keys::OUTPUT_DIR, env_out.display().to_string());
    let direct = direct_args(&dir.path().join("ignored.json"), &direct_out);

    let result = run_with_env(&direct, &env).unwrap();

    assert_eq!(result.config_source, ConfigSource::Environment);
    assert!(env_out.join("csv/customers.csv").exists());
    assert!(!direct_out.exists());
}

#[test]
fn test_direct_args_used_when_nothing_else_present() {
    let dir = tempdir().unwrap();
    let input = write_batch(dir.path(), &scenario_a_batch());
    let out = dir.path().join("out");

    let orchestrator = PipelineOrchestrator::configure(&direct_args(&input, &out), &MapEnv::new()).unwrap();

    assert_eq!(orchestrator.config().source, ConfigSource::DirectArgs);
    assert_eq!(orchestrator.state(), RunState::Configured);
    assert_eq!(orchestrator.config().output_dir, out);
}

#[test]
fn test_job_param_file_carries_rules_and_summary() {
    let dir = tempdir().unwrap();
    let input = write_batch(dir.path(), &scenario_a_batch());
    let out = dir.path().join("out");

    // 覆写业务规则: 信用分上限 700，场景 A 中 3 个客户有 2 个超出
    let rules = dir.path().join("rules.json");
    fs::write(
        &rules,
        json!({
            "business": [{
                "name": "strict_credit_score",
                "level": "primary",
                "field": "credit_score",
                "constraint": {"kind": "range", "min": 300, "max": 715, "integer": true}
            }]
        })
        .to_string(),
    )
    .unwrap();

    let job_file = dir.path().join("job.json");
    fs::write(
        &job_file,
        json!({
            "input_file": input.display().to_string(),
            "output_dir": out.display().to_string(),
            "rules_file": rules.display().to_string(),
            "summary": "true"
        })
        .to_string(),
    )
    .unwrap();

    let env = MapEnv::new().with(env_keys::JOB_PARAM_FILE, job_file.display().to_string());
    let result = run_with_env(&DirectArgs::default(), &env).unwrap();

    assert_eq!(result.config_source, ConfigSource::JobParamFile);
    assert_eq!(result.validation.error_count(), 2);
    assert!(!result.passed());
    assert!(out.join("csv/customer_flat.csv").exists());
    assert!(!job_file.exists());
}

#[test]
fn test_job_file_without_input_falls_through_and_is_removed() {
    let dir = tempdir().unwrap();
    let input = write_batch(dir.path(), &scenario_a_batch());
    let job_file = dir.path().join("job.json");
    fs::write(&job_file, json!({ "job_name": "no-input" }).to_string()).unwrap();

    let env = MapEnv::new()
        .with(env_keys::JOB_PARAM_FILE, job_file.display().to_string())
        .with(env_keys::INPUT_FILE, input.display().to_string());

    let resolved = resolve_config(&DirectArgs::default(), &env).unwrap();
    assert_eq!(resolved.config.source, ConfigSource::Environment);
    assert!(!job_file.exists());
}

#[test]
fn test_malformed_job_file_aborts_run() {
    let dir = tempdir().unwrap();
    let job_file = dir.path().join("job.json");
    fs::write(&job_file, "[1, 2, 3]").unwrap();

    let env = MapEnv::new().with(env_keys::JOB_PARAM_FILE, job_file.display().to_string());
    let abort = PipelineOrchestrator::configure(&DirectArgs::default(), &env)
        .err()
        .unwrap();

    assert_eq!(abort.kind(), "ConfigResolutionError");
    assert_eq!(abort.state(), RunState::Failed);
    assert!(!job_file.exists());
}
