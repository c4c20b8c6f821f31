// ==========================================
// 银行多数据集流水线 - 校验层
// ==========================================
// 职责: 四类规则族独立执行，全部违规收集后生成报告
//   1. referential - 标识唯一 + 外键批次级唯一解析
//   2. temporal    - 沿血缘的时间先后
//   3. business    - 规则表区间/枚举/容差带 + 流水余额
//   4. format      - 必填/正则/枚举/日期格式
// 红线: 违规是数据，不是错误；某一类失败不影响其他类检测
// ==========================================

pub mod business;
pub mod format;
pub mod referential;
pub mod temporal;

#[cfg(test)]
pub(crate) mod test_support;

use crate::config::rules::RuleSet;
use crate::domain::lineage::LineageIndex;
use crate::domain::record::Batch;
use crate::domain::report::ValidationReport;
use crate::error::ConfigError;
use chrono::{Local, NaiveDate};
use format::FormatTable;
use tracing::{debug, info, instrument};

/// 校验选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// 年龄类规则的参考日期
    pub as_of: NaiveDate,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            as_of: Local::now().date_naive(),
        }
    }
}

// ==========================================
// Validator - 批次校验器
// ==========================================
pub struct Validator {
    rules: RuleSet,
    format: FormatTable,
    options: ValidationOptions,
}

impl Validator {
    /// 创建校验器（预编译格式规则）
    ///
    /// # 参数
    /// - rules: 规则配置（含层级结构）
    ///
    /// # 返回
    /// - Err(InvalidRule): 规则表中存在无法编译的正则
    pub fn new(rules: &RuleSet) -> Result<Self, ConfigError> {
        Ok(Self {
            format: FormatTable::compile(&rules.format)?,
            rules: rules.clone(),
            options: ValidationOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// 校验批次
    ///
    /// 先构建一次血缘索引，再依次运行四类规则族
    #[instrument(skip(self, batch), fields(records = batch.len()))]
    pub fn validate(&self, batch: &Batch) -> ValidationReport {
        let schema = &self.rules.schema;
        let index = LineageIndex::build(batch, schema);

        let referential = referential::check(&index, schema);
        let temporal = temporal::check(&index, schema);
        let mut business = business::check_rules(&index, &self.rules.business, self.options.as_of);
        if let Some(rule) = &self.rules.running_balance {
            business.extend(business::check_running_balance(&index, rule));
        }
        let format = self.format.check(&index);

        debug!(
            referential = referential.len(),
            temporal = temporal.len(),
            business = business.len(),
            format = format.len(),
            "规则族执行完成"
        );

        let violations = referential
            .into_iter()
            .chain(temporal)
            .chain(business)
            .chain(format)
            .collect();

        let report = ValidationReport::new(index.entity_counts(), violations);
        info!(
            passed = report.passed(),
            errors = report.error_count(),
            warnings = report.warning_count(),
            "批次校验完成"
        );
        report
    }
}

/// 使用默认银行规则校验批次
pub fn validate(batch: &Batch) -> Result<ValidationReport, ConfigError> {
    Ok(Validator::new(&RuleSet::default())?.validate(batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EntityLevel, ViolationCategory};
    use test_support::{batch_from, sample_record};

    fn validator() -> Validator {
        Validator::new(&RuleSet::default())
            .unwrap()
            .with_options(ValidationOptions {
                as_of: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            })
    }

    #[test]
    fn test_clean_batch_passes_with_counts() {
        let batch = batch_from(vec![sample_record("C1", &["A1", "A2"]), sample_record("C2", &["A3"])]);
        let report = validator().validate(&batch);

        assert!(report.passed());
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.entity_counts().get(EntityLevel::Child), 3);
    }

    #[test]
    fn test_families_do_not_short_circuit() {
        let mut record = sample_record("C1", &["A1"]);
        record["accounts"][0]["open_date"] = "2010-01-01".into();
        record["customer"]["phone"] = "999-0000".into();
        record["transactions"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({
                "transaction_id": "T-ORPHAN",
                "account_id": "NOPE",
                "transaction_date": "2017-01-01",
                "transaction_type": "Credit",
                "amount": 10
            }));

        let report = validator().validate(&batch_from(vec![record]));

        assert!(!report.passed());
        assert_eq!(report.in_category(ViolationCategory::Referential).count(), 1);
        assert_eq!(report.in_category(ViolationCategory::Temporal).count(), 1);
        assert_eq!(report.in_category(ViolationCategory::Format).count(), 1);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_counts_computed_on_failure() {
        let batch = batch_from(vec![sample_record("C1", &["A1"]), sample_record("C1", &["A2"])]);
        let report = validator().validate(&batch);

        assert!(!report.passed());
        assert_eq!(report.entity_counts().primary, 2);
        assert_eq!(report.entity_counts().grandchild, 2);
    }
}
