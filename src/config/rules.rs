// ==========================================
// 银行多数据集流水线 - 规则配置表
// ==========================================
// 职责: 业务规则表（按层级/子类型的数值区间、枚举、容差带）
//       格式规则表（必填、正则、枚举、日期格式）
// 存储: 内置默认值，可由 JSON 规则文件按节覆写
// ==========================================

use crate::config::schema::HierarchySchema;
use crate::domain::types::{EntityLevel, Severity};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ==========================================
// 业务规则
// ==========================================

/// 规则适用条件（字段取值命中列表之一）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub one_of: Vec<String>,
}

/// 字段约束
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldConstraint {
    /// 数值区间（闭区间，端点可缺省）
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        integer: bool,
    },
    /// 枚举取值
    OneOf { values: Vec<String> },
    /// 取值不得低于另一字段的相反数（如 余额 >= -透支额度，额度缺失按 0）
    NotBelowNegated { field: String },
    /// 按日期字段计算的年龄区间（年）
    AgeYears { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub name: String,
    pub level: EntityLevel,
    #[serde(default)]
    pub when: Option<Condition>,
    pub field: String,
    pub constraint: FieldConstraint,
    #[serde(default)]
    pub severity: Severity,
    /// 取值缺失也记为违规（默认跳过缺失值）
    #[serde(default)]
    pub flag_missing: bool,
}

/// 流水余额一致性规则
///
/// 同一子实体下相邻孙实体的余额差必须等于后者的带符号金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningBalanceRule {
    pub balance_field: String,
    pub amount_field: String,
    pub tolerance: f64,
}

// ==========================================
// 格式规则
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatCheck {
    /// 必填
    Required,
    /// 正则匹配
    Pattern { regex: String },
    /// 枚举取值
    OneOf { values: Vec<String> },
    /// 日期格式（任一 chrono 格式串匹配即可）
    Date { formats: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatRule {
    pub name: String,
    pub level: EntityLevel,
    pub field: String,
    pub check: FormatCheck,
    /// 关键字段: 违规记为错误，否则记为警告
    #[serde(default)]
    pub critical: bool,
}

// ==========================================
// RuleSet - 完整规则配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub schema: HierarchySchema,
    pub business: Vec<BusinessRule>,
    pub running_balance: Option<RunningBalanceRule>,
    pub format: Vec<FormatRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::banking()
    }
}

impl RuleSet {
    /// 从 JSON 规则文件加载（缺省的节沿用银行默认值）
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&raw).map_err(|e| ConfigError::RulesFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 银行默认规则
    pub fn banking() -> Self {
        Self {
            schema: HierarchySchema::banking(),
            business: banking_business_rules(),
            running_balance: Some(RunningBalanceRule {
                balance_field: "balance_after".to_string(),
                amount_field: "amount".to_string(),
                tolerance: 0.01,
            }),
            format: banking_format_rules(),
        }
    }
}

fn when(field: &str, values: &[&str]) -> Option<Condition> {
    Some(Condition {
        field: field.to_string(),
        one_of: values.iter().map(|v| v.to_string()).collect(),
    })
}

fn range(min: Option<f64>, max: Option<f64>) -> FieldConstraint {
    FieldConstraint::Range {
        min,
        max,
        integer: false,
    }
}

fn business(
    name: &str,
    level: EntityLevel,
    condition: Option<Condition>,
    field: &str,
    constraint: FieldConstraint,
    severity: Severity,
) -> BusinessRule {
    BusinessRule {
        name: name.to_string(),
        level,
        when: condition,
        field: field.to_string(),
        constraint,
        severity,
        flag_missing: false,
    }
}

fn banking_business_rules() -> Vec<BusinessRule> {
    use EntityLevel::*;
    use Severity::*;

    vec![
        // ===== 客户 =====
        business(
            "credit_score_range",
            Primary,
            None,
            "credit_score",
            FieldConstraint::Range {
                min: Some(300.0),
                max: Some(850.0),
                integer: true,
            },
            Error,
        ),
        business(
            "customer_age",
            Primary,
            None,
            "date_of_birth",
            FieldConstraint::AgeYears {
                min: 18.0,
                max: 120.0,
            },
            Warning,
        ),
        // ===== 账户 =====
        business(
            "deposit_balance_non_negative",
            Child,
            when("account_type", &["Savings", "CD", "Money Market"]),
            "current_balance",
            range(Some(0.0), None),
            Error,
        ),
        business(
            "checking_overdraft_limit",
            Child,
            when("account_type", &["Checking"]),
            "current_balance",
            FieldConstraint::NotBelowNegated {
                field: "overdraft_limit".to_string(),
            },
            Error,
        ),
        // 余额缺失按非零处理
        BusinessRule {
            flag_missing: true,
            ..business(
                "closed_account_zero_balance",
                Child,
                when("account_status", &["Closed"]),
                "current_balance",
                range(Some(0.0), Some(0.0)),
                Warning,
            )
        },
        business(
            "checking_interest_band",
            Child,
            when("account_type", &["Checking"]),
            "interest_rate",
            range(None, Some(1.0)),
            Warning,
        ),
        business(
            "savings_interest_band",
            Child,
            when("account_type", &["Savings"]),
            "interest_rate",
            range(None, Some(5.0)),
            Warning,
        ),
        // ===== 交易 =====
        business(
            "debit_sign",
            Grandchild,
            when("transaction_type", &["Debit"]),
            "amount",
            range(None, Some(0.0)),
            Warning,
        ),
        business(
            "credit_sign",
            Grandchild,
            when("transaction_type", &["Credit"]),
            "amount",
            range(Some(0.0), None),
            Warning,
        ),
    ]
}

fn format_rule(name: &str, level: EntityLevel, field: &str, check: FormatCheck, critical: bool) -> FormatRule {
    FormatRule {
        name: name.to_string(),
        level,
        field: field.to_string(),
        check,
        critical,
    }
}

fn banking_format_rules() -> Vec<FormatRule> {
    use EntityLevel::*;

    // 标识与外键由加载器/引用校验负责，不在必填列表中
    let required: [(EntityLevel, &[&str]); 3] = [
        (
            Primary,
            &[
                "first_name",
                "last_name",
                "date_of_birth",
                "email",
                "phone",
                "customer_since",
                "customer_segment",
                "credit_score",
            ],
        ),
        (
            Child,
            &[
                "account_type",
                "account_status",
                "open_date",
                "current_balance",
                "currency",
                "interest_rate",
            ],
        ),
        (Grandchild, &["transaction_date", "transaction_type", "amount"]),
    ];

    let mut rules: Vec<FormatRule> = required
        .iter()
        .flat_map(|(level, fields)| {
            fields.iter().map(move |field| {
                format_rule(
                    &format!("required_{}", field),
                    *level,
                    field,
                    FormatCheck::Required,
                    true,
                )
            })
        })
        .collect();

    let date_only = || FormatCheck::Date {
        formats: vec!["%Y-%m-%d".to_string()],
    };

    rules.extend([
        format_rule("date_of_birth_shape", Primary, "date_of_birth", date_only(), true),
        format_rule("customer_since_shape", Primary, "customer_since", date_only(), true),
        format_rule("open_date_shape", Child, "open_date", date_only(), true),
        format_rule(
            "transaction_date_shape",
            Grandchild,
            "transaction_date",
            FormatCheck::Date {
                formats: vec![
                    "%Y-%m-%d".to_string(),
                    "%Y-%m-%dT%H:%M:%S".to_string(),
                    "%Y-%m-%d %H:%M:%S".to_string(),
                ],
            },
            true,
        ),
        format_rule(
            "phone_privacy_prefix",
            Primary,
            "phone",
            FormatCheck::Pattern {
                regex: r"^555-".to_string(),
            },
            false,
        ),
        format_rule(
            "postal_code_shape",
            Primary,
            "postal_code",
            FormatCheck::Pattern {
                regex: r"^[0-9]{5}(-[0-9]{4})?$".to_string(),
            },
            false,
        ),
        format_rule(
            "email_shape",
            Primary,
            "email",
            FormatCheck::Pattern {
                regex: r"^[^@\s]+@[^@\s]+\.[^@\s]+$".to_string(),
            },
            false,
        ),
        format_rule(
            "currency_code",
            Child,
            "currency",
            FormatCheck::Pattern {
                regex: r"^[A-Z]{3}$".to_string(),
            },
            false,
        ),
        format_rule(
            "account_status_values",
            Child,
            "account_status",
            FormatCheck::OneOf {
                values: ["Active", "Inactive", "Dormant", "Frozen", "Closed"]
                    .iter()
                    .map(|v| v.to_string())
                    .collect(),
            },
            false,
        ),
        format_rule(
            "transaction_type_values",
            Grandchild,
            "transaction_type",
            FormatCheck::OneOf {
                values: vec!["Debit".to_string(), "Credit".to_string()],
            },
            false,
        ),
    ]);

    rules
}
