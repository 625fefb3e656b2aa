// ==========================================
// 促销日历对账系统 - 导入流程
// ==========================================
// 职责: 整合导入流程, 从文件到内存记录
// 流程: 解析 → 列名解析 → 行映射（跳过哨兵/无品牌行）
// ==========================================

use crate::config::OverrideTables;
use crate::domain::deal::{ExternalSnapshot, SpecRecord};
use crate::domain::types::FrequencyClass;
use crate::importer::error::ImportResult;
use crate::importer::external_mapper::ExternalRowMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::spec_mapper::{MappedSection, SkippedRow, SpecRowMapper};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 三个分区合并后的导入结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanImport {
    pub records: Vec<SpecRecord>,
    pub skipped: Vec<(FrequencyClass, SkippedRow)>,
}

// ==========================================
// PlanImporter - 计划表 / 外部导出导入器
// ==========================================
pub struct PlanImporter<'a> {
    tables: &'a OverrideTables,
    parser: UniversalFileParser,
}

impl<'a> PlanImporter<'a> {
    pub fn new(tables: &'a OverrideTables) -> Self {
        Self {
            tables,
            parser: UniversalFileParser,
        }
    }

    /// 导入单个分区
    #[instrument(skip(self, section, path), fields(section = %section))]
    pub fn import_section<P: AsRef<Path>>(
        &self,
        section: FrequencyClass,
        path: P,
    ) -> ImportResult<MappedSection> {
        // === 步骤 1: 解析文件 ===
        let table = self.parser.parse(path.as_ref())?;
        debug!(rows = table.rows.len(), "分区文件解析完成");

        // === 步骤 2: 行映射 ===
        let mapper = SpecRowMapper::for_table(section, &table, self.tables);
        Ok(mapper.map_table(&table))
    }

    /// 导入周循环 / 月循环 / 单次促销三个分区
    pub fn import_plan<P: AsRef<Path>>(
        &self,
        weekly: P,
        monthly: P,
        sale: P,
    ) -> ImportResult<PlanImport> {
        let mut result = PlanImport::default();
        for (section, path) in [
            (FrequencyClass::RecurringWeekly, weekly),
            (FrequencyClass::RecurringMonthly, monthly),
            (FrequencyClass::OneOffSale, sale),
        ] {
            let mapped = self.import_section(section, path)?;
            result.records.extend(mapped.records);
            result
                .skipped
                .extend(mapped.skipped.into_iter().map(|s| (section, s)));
        }

        info!(
            records = result.records.len(),
            skipped = result.skipped.len(),
            "计划表导入完成"
        );
        Ok(result)
    }

    /// 导入外部系统导出表
    #[instrument(skip(self, path))]
    pub fn import_external<P: AsRef<Path>>(&self, path: P) -> ImportResult<ExternalSnapshot> {
        let table = self.parser.parse(path.as_ref())?;
        ExternalRowMapper::new().map_table(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_import_plan_three_sections() {
        let weekly = csv_file(&["Brand,Weekday,Discount", "Kiva,Monday,20%", "END420,END420,"]);
        let monthly = csv_file(&["Brand,Contracted Duration,Discount", "Wyld,15th,30%"]);
        let sale = csv_file(&["Brand,Sale Runs:,Discount", ",3/17/2025,10%"]);

        let tables = OverrideTables::default();
        let import = PlanImporter::new(&tables)
            .import_plan(weekly.path(), monthly.path(), sale.path())
            .unwrap();

        assert_eq!(import.records.len(), 2);
        assert_eq!(import.records[0].frequency_class, FrequencyClass::RecurringWeekly);
        assert_eq!(import.records[1].recurrence, "15th");
        assert_eq!(import.skipped.len(), 2);
    }

    #[test]
    fn test_import_external() {
        let export = csv_file(&["ID,Brand,Weekday", "101,Kiva,Monday", "102.0,Wyld,Friday"]);
        let tables = OverrideTables::default();
        let snapshot = PlanImporter::new(&tables).import_external(export.path()).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get(102).is_some());
    }
}
