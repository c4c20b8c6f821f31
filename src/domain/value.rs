// ==========================================
// 银行多数据集流水线 - 字段值工具
// ==========================================
// 职责: JSON 字段值的文本化、数值化、时间解析、单元格渲染
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// 时间戳宽松解析支持的格式（日期 / 日期时间）
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// 标量值的文本视图
///
/// - 字符串: TRIM 后非空才返回
/// - 数字/布尔: 转为文本
/// - null / 数组 / 对象: None
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 数值视图（数字直接取值，数字字符串尝试解析）
///
/// "NaN" / "inf" 等非有限值视为非数值
pub fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// 是否为整数（JSON 整数字面量）
pub fn is_integer(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_i64() || n.is_u64())
}

/// 值是否视为缺失（null / 空白字符串）
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// 宽松解析时间戳
///
/// 依次尝试: YYYY-MM-DD（按当天 00:00）、本地日期时间、RFC3339（转 UTC）
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// 按指定格式列表校验日期文本
pub fn matches_date_format(text: &str, formats: &[String]) -> bool {
    let text = text.trim();
    formats.iter().any(|format| {
        NaiveDateTime::parse_from_str(text, format).is_ok()
            || NaiveDate::parse_from_str(text, format).is_ok()
    })
}

/// 渲染 CSV 单元格
///
/// 字符串原样输出；数字使用 JSON 文本；null 为空单元格；
/// 嵌套数组/对象输出紧凑 JSON
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
