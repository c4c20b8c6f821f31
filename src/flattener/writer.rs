// ==========================================
// 银行多数据集流水线 - 表写出
// ==========================================
// 职责: 将 FlattenResult 写为 CSV（<output>/csv/<table>.csv）
//       汇总表额外写出 JSON（<output>/<primary>_flat.json）
// 红线: 同一批次重复写出字节一致
// ==========================================

use crate::domain::pipeline::{FlattenOutputs, TableOutput};
use crate::domain::table::{FlattenResult, Table};
use crate::error::StageResult;
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CSV_DIR: &str = "csv";

/// CSV 表写出器
pub struct CsvTableWriter {
    output_dir: PathBuf,
}

impl CsvTableWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn csv_dir(&self) -> PathBuf {
        self.output_dir.join(CSV_DIR)
    }

    /// 写出全部表
    ///
    /// # 返回
    /// 各表路径与行数（层级顺序，汇总表在最后）
    pub fn write_all(&self, result: &FlattenResult) -> StageResult<FlattenOutputs> {
        let csv_dir = self.csv_dir();
        fs::create_dir_all(&csv_dir)?;

        let mut tables = Vec::new();
        for table in result.tables() {
            tables.push(self.write_csv(&csv_dir, table)?);
        }

        if let Some(summary) = result.summary() {
            tables.push(self.write_csv(&csv_dir, summary)?);
            tables.push(self.write_json(summary)?);
        }

        Ok(FlattenOutputs {
            row_counts: result.row_counts(),
            tables,
        })
    }

    fn write_csv(&self, dir: &Path, table: &Table) -> StageResult<TableOutput> {
        let path = dir.join(format!("{}.csv", table.name()));
        let mut writer = WriterBuilder::new().has_headers(false).from_path(&path)?;

        writer.write_record(table.columns())?;
        for row in table.rendered_rows() {
            writer.write_record(&row)?;
        }
        writer.flush()?;

        debug!(table = table.name(), rows = table.row_count(), path = %path.display(), "CSV 写出完成");
        Ok(TableOutput {
            table: table.name().to_string(),
            path: path.display().to_string(),
            rows: table.row_count(),
        })
    }

    fn write_json(&self, table: &Table) -> StageResult<TableOutput> {
        let path = self.output_dir.join(format!("{}.json", table.name()));
        let text = serde_json::to_string_pretty(&table.to_records())?;
        fs::write(&path, text)?;

        Ok(TableOutput {
            table: table.name().to_string(),
            path: path.display().to_string(),
            rows: table.row_count(),
        })
    }
}
