// ==========================================
// 银行多数据集流水线 - 报告层
// ==========================================
// 职责: 结果文档（pipeline_results.json）+ 控制台可读报告
// 标签: rust-i18n（zh-CN 默认 / en）
// ==========================================

use crate::domain::pipeline::PipelineResult;
use crate::domain::report::Violation;
use crate::error::StageResult;
use crate::domain::types::EntityLevel;
use crate::i18n::{entity_label, t, t_with_args};
use crate::pipeline::PipelineAbort;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULT_FILE_NAME: &str = "pipeline_results.json";

/// 控制台最多列出的错误/警告条数
pub const CONSOLE_LIST_LIMIT: usize = 20;

const RULE: &str = "==========================================";

pub fn result_path(output_dir: &Path) -> PathBuf {
    output_dir.join(RESULT_FILE_NAME)
}

/// 写出结果文档（pretty JSON）
pub fn write_result_json(result: &PipelineResult, path: &Path) -> StageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(result)?;
    fs::write(path, text)?;
    info!(path = %path.display(), "结果文档已写出");
    Ok(())
}

fn push_violations<'a>(
    out: &mut String,
    violations: impl Iterator<Item = &'a Violation>,
    total: usize,
    more_key: &str,
) {
    for v in violations.take(CONSOLE_LIST_LIMIT) {
        let _ = writeln!(out, "  [{}] {} - {}", v.category, v.entity_id, v.description);
    }
    if total > CONSOLE_LIST_LIMIT {
        let rest = (total - CONSOLE_LIST_LIMIT).to_string();
        let _ = writeln!(out, "  {}", t_with_args(more_key, &[("count", &rest)]));
    }
}

/// 渲染控制台报告
///
/// # 参数
/// - verbose: 为 true 时列出警告明细，否则只给出警告数量提示
pub fn render_console(result: &PipelineResult, verbose: bool) -> String {
    let report = &result.validation;
    let counts = report.entity_counts();
    let mut out = String::new();

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "{}", t("report.title"));
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "{}: {}", t("report.run_id"), result.run_id);
    let _ = writeln!(out, "{}: {}", t("report.input"), result.input_file);
    let _ = writeln!(out, "{}: {}", t("report.output"), result.output_dir);
    let _ = writeln!(out, "{}: {}", t("report.source"), result.config_source);
    let _ = writeln!(out, "{}: {}", t("report.state"), result.state);

    let _ = writeln!(out, "\n---- {} ----", t("report.statistics"));
    for level in [EntityLevel::Primary, EntityLevel::Child, EntityLevel::Grandchild] {
        let _ = writeln!(out, "  {}: {}", entity_label(level), counts.get(level));
    }
    let _ = writeln!(out, "  {}: {}", t("report.errors"), report.error_count());
    let _ = writeln!(out, "  {}: {}", t("report.warnings"), report.warning_count());

    let _ = writeln!(out, "\n---- {} ----", t("report.tables"));
    for table in &result.flatten.tables {
        let _ = writeln!(out, "  {}: {} {} → {}", table.table, table.rows, t("report.rows"), table.path);
    }

    if report.error_count() > 0 {
        let _ = writeln!(out, "\n---- {} ----", t("report.error_list"));
        push_violations(&mut out, report.errors(), report.error_count(), "report.more_errors");
    }

    if report.warning_count() > 0 {
        if verbose {
            let _ = writeln!(out, "\n---- {} ----", t("report.warning_list"));
            push_violations(&mut out, report.warnings(), report.warning_count(), "report.more_warnings");
        } else {
            let count = report.warning_count().to_string();
            let _ = writeln!(out, "\n{}", t_with_args("report.warnings_hidden", &[("count", &count)]));
        }
    }

    let timings = &result.timings;
    let _ = writeln!(
        out,
        "\n{}: load {}ms / validate {}ms / flatten {}ms / write {}ms",
        t("report.timings"),
        timings.load_ms,
        timings.validate_ms,
        timings.flatten_ms,
        timings.write_ms
    );
    if let Some(path) = &result.result_file {
        let _ = writeln!(out, "{}: {}", t("report.result_file"), path);
    }

    let banner = if report.passed() {
        t("report.passed")
    } else {
        t("report.failed")
    };
    let _ = writeln!(out, "{}\n{}\n{}", RULE, banner, RULE);
    out
}

/// 渲染致命中止信息
pub fn render_failure(abort: &PipelineAbort) -> String {
    format!(
        "{}\n{} [{}]\n{}\n{}",
        RULE,
        t("report.fatal"),
        abort.kind(),
        abort.error,
        RULE
    )
}
