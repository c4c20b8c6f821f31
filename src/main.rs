// ==========================================
// 银行多数据集流水线 - 命令行入口
// ==========================================
// 退出码: 0 校验通过 / 1 运行完成但校验未通过 / 2 配置或结构错误中止
// 配置优先级: 作业参数文件 (file_name) > 环境变量 > 命令行参数
// ==========================================

use bank_multiset_pipeline::config::DirectArgs;
use bank_multiset_pipeline::domain::ExitSignal;
use bank_multiset_pipeline::pipeline::PipelineOrchestrator;
use bank_multiset_pipeline::{config::ProcessEnv, i18n, logging, reporter};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bank-multiset-pipeline")]
#[command(about = "校验并拆分嵌套的 客户 → 账户 → 交易 批次")]
#[command(version)]
struct Cli {
    /// 输入批次（嵌套 JSON 数组）
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 输出目录（默认 output）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 规则文件（JSON，覆写内置银行规则）
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// 列出警告明细
    #[arg(short, long)]
    verbose: bool,

    /// 额外生成每客户一行的汇总表
    #[arg(short, long)]
    summary: bool,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    json_logs: bool,

    /// 报告语言（zh-CN / en，默认 zh-CN）
    #[arg(long)]
    lang: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }
    i18n::init(cli.lang.as_deref());

    tracing::info!(
        "{} v{}",
        bank_multiset_pipeline::APP_NAME,
        bank_multiset_pipeline::VERSION
    );

    let direct = DirectArgs {
        input_file: cli.input,
        output_dir: cli.output,
        rules_file: cli.rules,
        job_name: None,
        verbose: cli.verbose,
        write_summary: cli.summary,
    };

    let orchestrator = match PipelineOrchestrator::configure(&direct, &ProcessEnv) {
        Ok(o) => o,
        Err(abort) => {
            eprintln!("{}", reporter::render_failure(&abort));
            return ExitCode::from(ExitSignal::Fatal.code());
        }
    };
    let verbose = orchestrator.config().verbose;

    match orchestrator.run() {
        Ok(result) => {
            println!("{}", reporter::render_console(&result, verbose));
            ExitCode::from(result.exit_signal().code())
        }
        Err(abort) => {
            eprintln!("{}", reporter::render_failure(&abort));
            ExitCode::from(ExitSignal::Fatal.code())
        }
    }
}
