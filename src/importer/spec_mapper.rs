// ==========================================
// 促销日历对账系统 - 计划表行映射
// ==========================================
// 职责: 单个分区的原始行 → SpecRecord
// 红线: 跳过无品牌行和 END420 哨兵行, 其余单元格原文保留, 解析交给引擎
// ==========================================

use crate::config::OverrideTables;
use crate::domain::deal::SpecRecord;
use crate::domain::types::FrequencyClass;
use crate::engine::date_expander::DateExpander;
use crate::importer::file_parser::ParsedTable;
use crate::importer::location_column::resolve_location_text;
use crate::importer::row::{ColumnResolver, RawRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 表格结束哨兵
const END_SENTINEL: &str = "END420";

/// 复选框视为"是"的取值
const TRUTHY: &[&str] = &["TRUE", "YES", "1", "X", "✔", "CHECKED"];

// ===== 逻辑列候选名 =====
const BRAND_COLUMNS: &[&str] = &["[Brand]", "Brand"];
const WEEKDAY_COLUMNS: &[&str] = &["[Weekday]", "Weekday", "Day of Week"];
const SALE_DATE_COLUMNS: &[&str] = &[
    "[Weekday]",
    "Sale Runs:",
    "Contracted Duration",
    "Weekday/ Day of Month",
    "Day of Week",
    "Weekday",
];
const MONTHLY_DAY_FALLBACK: &[&str] = &["Weekday/ Day of Month", "Day of Month", "Monthly Day"];
const DISCOUNT_COLUMNS: &[&str] = &[
    "[Daily Deal Discount]",
    "Deal Discount Value/Type",
    "Deal Discount",
    "Discount",
];
const VENDOR_COLUMNS: &[&str] = &[
    "[Discount paid by vendor]",
    "Brand Contribution % (Credit)",
    "Vendor Contribution",
    "Vendor %",
];
const CATEGORY_COLUMNS: &[&str] = &["[Category]", "Categories"];
const CATEGORY_EXCEPTION_COLUMNS: &[&str] = &["Category Exceptions"];
const NOTES_COLUMNS: &[&str] = &["SPECIAL NOTES", "Special Notes"];
const DEAL_INFO_COLUMNS: &[&str] = &["Deal Information", "Deal Info"];
const ID_COLUMNS: &[&str] = &["MIS ID", "ID"];
const CONTRACT_COLUMNS: &[&str] = &[
    "Contracted Duration (MM/DD/YY - MM/DD/YY)",
    "Contracted Duration",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappedSection {
    pub records: Vec<SpecRecord>,
    pub skipped: Vec<SkippedRow>,
}

// ==========================================
// SpecRowMapper - 计划表行映射器
// ==========================================
pub struct SpecRowMapper {
    section: FrequencyClass,
    columns: ColumnResolver,
}

impl SpecRowMapper {
    pub fn new(section: FrequencyClass, columns: ColumnResolver) -> Self {
        Self { section, columns }
    }

    /// 由表头推导列名解析器
    pub fn for_table(section: FrequencyClass, table: &ParsedTable, tables: &OverrideTables) -> Self {
        Self::new(
            section,
            ColumnResolver::from_headers(&table.headers).with_overrides(tables),
        )
    }

    /// 映射整张表
    pub fn map_table(&self, table: &ParsedTable) -> MappedSection {
        let mut mapped = MappedSection::default();
        for row in &table.rows {
            match self.map_row(row) {
                Ok(record) => mapped.records.push(record),
                Err(reason) => {
                    debug!(row = row.row_number(), reason = %reason, "跳过计划表行");
                    mapped.skipped.push(SkippedRow {
                        row: row.row_number(),
                        reason,
                    });
                }
            }
        }
        info!(
            section = %self.section,
            records = mapped.records.len(),
            skipped = mapped.skipped.len(),
            "计划表分区映射完成"
        );
        mapped
    }

    /// 映射单行, Err 为跳过原因
    pub fn map_row(&self, row: &RawRow) -> Result<SpecRecord, String> {
        if is_end_sentinel_row(row) {
            return Err(format!("{} 哨兵行", END_SENTINEL));
        }

        let brand = self.columns.get(row, BRAND_COLUMNS);
        if is_blank(&brand) {
            return Err("品牌为空".to_string());
        }

        let contract = self.columns.get(row, CONTRACT_COLUMNS);
        let (start, end) = DateExpander::parse_contract_range(&contract);

        Ok(
            SpecRecord::new(brand, self.section, self.recurrence(row), row.row_number())
                .with_discount(self.columns.get(row, DISCOUNT_COLUMNS))
                .with_vendor_contribution(self.columns.get(row, VENDOR_COLUMNS))
                .with_locations(resolve_location_text(row, &self.columns))
                .with_categories(format_categories(
                    &self.columns.get(row, CATEGORY_COLUMNS),
                    &self.columns.get(row, CATEGORY_EXCEPTION_COLUMNS),
                ))
                .with_notes(self.columns.get(row, NOTES_COLUMNS))
                .with_rebate_type(self.rebate_type(row))
                .with_external_id_cell(self.columns.get(row, ID_COLUMNS))
                .with_contract(start, end)
                .with_deal_info(self.columns.get(row, DEAL_INFO_COLUMNS)),
        )
    }

    fn recurrence(&self, row: &RawRow) -> String {
        match self.section {
            FrequencyClass::RecurringWeekly => self.columns.get(row, WEEKDAY_COLUMNS),
            FrequencyClass::RecurringMonthly => monthly_day(row, &self.columns),
            FrequencyClass::OneOffSale => self.columns.get(row, SALE_DATE_COLUMNS),
        }
    }

    /// 返利类型: Wholesale / Retail 恰好一个为真时取该值, 否则为空
    fn rebate_type(&self, row: &RawRow) -> String {
        let tagged = self.columns.headers_with_tag(row, "[rebate type]");
        let (wholesale, retail) = if tagged.is_empty() {
            (
                is_truthy(&self.columns.get(row, &["Wholesale", "Wholesale?"])),
                is_truthy(&self.columns.get(row, &["Retail", "Retail?"])),
            )
        } else {
            let flag = |needle: &str| {
                tagged
                    .iter()
                    .filter(|h| h.to_lowercase().contains(needle))
                    .any(|h| is_truthy(row.get(h).unwrap_or("")))
            };
            (flag("wholesale"), flag("retail"))
        };

        match (wholesale, retail) {
            (true, false) => "Wholesale".to_string(),
            (false, true) => "Retail".to_string(),
            _ => String::new(),
        }
    }
}

/// 月循环的"每月几号": 优先任何含 "contracted duration" 的表头
fn monthly_day(row: &RawRow, columns: &ColumnResolver) -> String {
    let by_header = row
        .cells()
        .iter()
        .find(|(h, _)| h.to_lowercase().replace('\n', " ").contains("contracted duration"))
        .map(|(_, v)| v.trim().to_string());
    match by_header {
        Some(value) => value,
        None => columns.get(row, MONTHLY_DAY_FALLBACK),
    }
}

/// 类目展示: "All Categories" 带例外时为 "All Categories (Except: X)"
pub fn format_categories(categories: &str, exceptions: &str) -> String {
    let categories = categories.trim();
    let exceptions = exceptions.trim();

    if categories.to_lowercase().contains("all categories") {
        if is_blank(exceptions) {
            return "All Categories".to_string();
        }
        return format!("All Categories (Except: {})", exceptions);
    }
    if is_blank(categories) {
        return String::new();
    }
    categories
        .split(',')
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 2 个及以上单元格恰好是 END420
fn is_end_sentinel_row(row: &RawRow) -> bool {
    row.values()
        .filter(|v| v.trim().eq_ignore_ascii_case(END_SENTINEL))
        .count()
        >= 2
}

fn is_truthy(value: &str) -> bool {
    TRUTHY.contains(&value.trim().to_uppercase().as_str())
}

fn is_blank(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "" | "nan" | "none" | "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(section: FrequencyClass, headers: &[&str]) -> SpecRowMapper {
        SpecRowMapper::new(section, ColumnResolver::from_headers(headers))
    }

    #[test]
    fn test_map_weekly_row() {
        let headers = [
            "Brand [Brand]",
            "Weekday [Weekday]",
            "Deal Discount",
            "Vendor Contribution",
            "Locations (Discount Applies at)",
            "Categories",
            "Category Exceptions",
            "MIS ID",
            "Contracted Duration (MM/DD/YY - MM/DD/YY)",
            "Wholesale?",
            "Retail?",
        ];
        let row = RawRow::from_pairs(
            7,
            &[
                ("Brand [Brand]", "Kiva"),
                ("Weekday [Weekday]", "Monday"),
                ("Deal Discount", "20%"),
                ("Vendor Contribution", "50%"),
                ("Locations (Discount Applies at)", "Davis, Dixon"),
                ("Categories", "All Categories"),
                ("Category Exceptions", "Flower"),
                ("MIS ID", "W1: 12345"),
                ("Contracted Duration (MM/DD/YY - MM/DD/YY)", "03/01/25 - 03/31/25"),
                ("Wholesale?", "TRUE"),
                ("Retail?", "FALSE"),
            ],
        );

        let record = mapper(FrequencyClass::RecurringWeekly, &headers)
            .map_row(&row)
            .unwrap();

        assert_eq!(record.brand, "Kiva");
        assert_eq!(record.recurrence, "Monday");
        assert_eq!(record.discount, "20%");
        assert_eq!(record.location_spec, "Davis, Dixon");
        assert_eq!(record.category_spec, "All Categories (Except: Flower)");
        assert_eq!(record.rebate_type, "Wholesale");
        assert_eq!(record.external_id_cell, "W1: 12345");
        assert_eq!(record.origin.first_row(), 7);
        assert_eq!(record.contract_start.map(|d| d.to_string()).as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn test_monthly_day_from_contracted_duration() {
        let row = RawRow::from_pairs(3, &[("Brand", "Wyld"), ("Contracted\nDuration", "15th")]);
        let record = mapper(FrequencyClass::RecurringMonthly, &["Brand", "Contracted\nDuration"])
            .map_row(&row)
            .unwrap();
        assert_eq!(record.recurrence, "15th");
    }

    #[test]
    fn test_skip_rows() {
        let m = mapper(FrequencyClass::RecurringWeekly, &["Brand", "Weekday"]);
        assert!(m.map_row(&RawRow::from_pairs(2, &[("Brand", ""), ("Weekday", "Monday")])).is_err());
        assert!(m
            .map_row(&RawRow::from_pairs(3, &[("Brand", "END420"), ("Weekday", "end420")]))
            .is_err());
        // 单个 END420 不是哨兵
        assert!(m
            .map_row(&RawRow::from_pairs(4, &[("Brand", "END420"), ("Weekday", "Monday")]))
            .is_ok());
    }

    #[test]
    fn test_rebate_type_ambiguous_is_empty() {
        let headers = ["Brand", "Wholesale? [Rebate type]", "Retail? [Rebate type]"];
        let m = mapper(FrequencyClass::OneOffSale, &headers);
        let both = RawRow::from_pairs(
            2,
            &[("Brand", "Kiva"), ("Wholesale? [Rebate type]", "x"), ("Retail? [Rebate type]", "yes")],
        );
        assert_eq!(m.map_row(&both).unwrap().rebate_type, "");

        let retail = RawRow::from_pairs(
            3,
            &[("Brand", "Kiva"), ("Wholesale? [Rebate type]", ""), ("Retail? [Rebate type]", "✔")],
        );
        assert_eq!(m.map_row(&retail).unwrap().rebate_type, "Retail");
    }

    #[test]
    fn test_format_categories() {
        assert_eq!(format_categories("All Categories", ""), "All Categories");
        assert_eq!(format_categories("Flower ,Edibles,", ""), "Flower, Edibles");
        assert_eq!(format_categories("nan", ""), "");
    }
}
