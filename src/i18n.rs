// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库，用于控制台报告标签
// 语言: zh-CN（默认）/ en
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化，
//       其 fallback 只覆盖缺失的键，默认语言须由 init 显式设置
// ==========================================

use crate::domain::types::EntityLevel;
use tracing::warn;

pub const DEFAULT_LOCALE: &str = "zh-CN";

pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 归一化语言写法
///
/// "zh" / "zh_CN.UTF-8" → "zh-CN"；"en" / "en_US" / "EN-gb" → "en"；其余为 None
pub fn normalize_locale(raw: &str) -> Option<&'static str> {
    let tag = raw.trim().split(['.', '@']).next().unwrap_or("").to_lowercase();
    match tag.split(['-', '_']).next().unwrap_or("") {
        "zh" => Some("zh-CN"),
        "en" => Some("en"),
        _ => None,
    }
}

/// 设置报告语言
///
/// # 参数
/// - requested: 调用方指定的语言（None 或不支持时使用 zh-CN）
///
/// # 返回
/// 实际生效的语言代码
pub fn init(requested: Option<&str>) -> &'static str {
    let locale = match requested {
        None => DEFAULT_LOCALE,
        Some(raw) => normalize_locale(raw).unwrap_or_else(|| {
            warn!(requested = raw, fallback = DEFAULT_LOCALE, "不支持的报告语言");
            DEFAULT_LOCALE
        }),
    };
    rust_i18n::set_locale(locale);
    locale
}

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息并替换 %{name} 占位符
///
/// # 示例
/// ```no_run
/// use bank_multiset_pipeline::i18n::t_with_args;
/// let msg = t_with_args("report.more_errors", &[("count", "5")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(key), |text, (name, value)| {
        text.replace(&format!("%{{{}}}", name), value)
    })
}

/// 层级的报告标签（客户 / 账户 / 交易）
pub fn entity_label(level: EntityLevel) -> String {
    t(match level {
        EntityLevel::Primary => "report.entity_primary",
        EntityLevel::Child => "report.entity_child",
        EntityLevel::Grandchild => "report.entity_grandchild",
    })
}
