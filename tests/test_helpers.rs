// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的记录构造、快照构造、临时文件等功能
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDate;
use promo_reconcile::domain::{ExternalRecord, ExternalSnapshot, FrequencyClass, SpecRecord, TargetMonth};
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

/// 2025 年 3 月的某一天
pub fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

/// 2025 年 9 月的某一天（9/1 为周一）
pub fn september(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
}

pub fn target(month: u32, year: i32) -> TargetMonth {
    TargetMonth::new(month, year).unwrap()
}

/// 创建测试用的计划表记录
pub fn create_test_spec(
    brand: &str,
    section: FrequencyClass,
    recurrence: &str,
    row: usize,
    locations: &str,
) -> SpecRecord {
    SpecRecord::new(brand, section, recurrence, row)
        .with_discount("20%")
        .with_vendor_contribution("50%")
        .with_locations(locations)
        .with_categories("Edibles")
}

/// 创建测试用的外部记录
pub fn create_test_external(
    id: u64,
    brand: &str,
    weekday: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ExternalRecord {
    let mut record = ExternalRecord::new(id, brand);
    record.weekday = weekday.to_string();
    record.discount = "20".to_string();
    record.vendor_contribution = "50".to_string();
    record.categories = "Edibles".to_string();
    record.locations = "All Locations".to_string();
    record.start_date = start;
    record.end_date = end;
    record
}

pub fn create_test_snapshot(records: Vec<ExternalRecord>) -> ExternalSnapshot {
    ExternalSnapshot::new(records)
}

/// 写入临时 CSV 文件（需要保持存活）
pub fn create_test_csv(lines: &[&str]) -> NamedTempFile {
    let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
    for line in lines {
        writeln!(temp_file, "{}", line).unwrap();
    }
    temp_file
}
