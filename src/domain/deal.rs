// ==========================================
// 促销日历对账系统 - 促销记录
// ==========================================
// 职责: 计划表记录 (SpecRecord)、外部系统记录 (ExternalRecord)、外部快照
// 红线: 记录字段保持原始文本, 解析在引擎层完成
// ==========================================

use crate::domain::types::{DealTier, FrequencyClass};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// TargetMonth - 规划目标月份
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetMonth {
    pub year: i32,
    pub month: u32,
}

impl TargetMonth {
    pub fn new(month: u32, year: i32) -> EngineResult<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::InvalidTargetMonth { year, month });
        }
        Ok(Self { year, month })
    }

    pub fn first_day(&self) -> NaiveDate {
        // new() 已校验
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// 月份序号 (year*12 + month), 用于计算月份差
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + self.month as i64
    }
}

// ==========================================
// RowOrigin - 记录来源行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOrigin {
    pub section: FrequencyClass,
    pub row_numbers: Vec<usize>, // 多日合并后包含多行
}

impl RowOrigin {
    pub fn single(section: FrequencyClass, row_number: usize) -> Self {
        Self {
            section,
            row_numbers: vec![row_number],
        }
    }

    pub fn first_row(&self) -> usize {
        self.row_numbers.first().copied().unwrap_or(0)
    }
}

// ==========================================
// SpecRecord - 计划表促销记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRecord {
    // ===== 身份 =====
    pub brand: String, // 可能是多品牌 "A, B"
    pub frequency_class: FrequencyClass,
    pub origin: RowOrigin,

    // ===== 周期 =====
    pub recurrence: String, // 周几 / 每月几号 / 具体日期
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,

    // ===== 促销内容 =====
    pub discount: String,
    pub vendor_contribution: String,
    pub location_spec: String,
    pub category_spec: String,
    pub rebate_type: String,
    pub notes: String,
    pub deal_info: String,

    // ===== 外部系统关联 =====
    pub external_id_cell: String, // 标签化 ID 单元格原文
}

impl SpecRecord {
    /// 创建最小记录, 其余字段用 with_* 补齐
    pub fn new(
        brand: impl Into<String>,
        frequency_class: FrequencyClass,
        recurrence: impl Into<String>,
        row_number: usize,
    ) -> Self {
        Self {
            brand: brand.into(),
            frequency_class,
            origin: RowOrigin::single(frequency_class, row_number),
            recurrence: recurrence.into(),
            contract_start: None,
            contract_end: None,
            discount: String::new(),
            vendor_contribution: String::new(),
            location_spec: String::new(),
            category_spec: String::new(),
            rebate_type: String::new(),
            notes: String::new(),
            deal_info: String::new(),
            external_id_cell: String::new(),
        }
    }

    pub fn with_discount(mut self, discount: impl Into<String>) -> Self {
        self.discount = discount.into();
        self
    }

    pub fn with_vendor_contribution(mut self, vendor: impl Into<String>) -> Self {
        self.vendor_contribution = vendor.into();
        self
    }

    pub fn with_locations(mut self, locations: impl Into<String>) -> Self {
        self.location_spec = locations.into();
        self
    }

    pub fn with_categories(mut self, categories: impl Into<String>) -> Self {
        self.category_spec = categories.into();
        self
    }

    pub fn with_external_id_cell(mut self, cell: impl Into<String>) -> Self {
        self.external_id_cell = cell.into();
        self
    }

    pub fn with_contract(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.contract_start = start;
        self.contract_end = end;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_rebate_type(mut self, rebate_type: impl Into<String>) -> Self {
        self.rebate_type = rebate_type.into();
        self
    }

    pub fn with_deal_info(mut self, deal_info: impl Into<String>) -> Self {
        self.deal_info = deal_info.into();
        self
    }

    pub fn tier(&self) -> DealTier {
        self.frequency_class.tier()
    }

    /// 身份字段检查（导入层保证, 引擎层只做契约校验）
    pub fn ensure_identity(&self) -> EngineResult<()> {
        if self.brand.trim().is_empty() {
            return Err(EngineError::MissingIdentityField {
                row: self.origin.first_row(),
                field: "brand".to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// ExternalRecord - 外部系统促销记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub id: u64,
    pub brand: String,
    pub linked_brand: String,
    pub weekday: String,
    pub discount: String,
    pub vendor_contribution: String,
    pub locations: String,
    pub categories: String,
    pub rebate_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>, // None = 长期有效或无法解析
}

impl ExternalRecord {
    pub fn new(id: u64, brand: impl Into<String>) -> Self {
        Self {
            id,
            brand: brand.into(),
            linked_brand: String::new(),
            weekday: String::new(),
            discount: String::new(),
            vendor_contribution: String::new(),
            locations: String::new(),
            categories: String::new(),
            rebate_type: String::new(),
            start_date: None,
            end_date: None,
        }
    }

    /// 指定日期是否处于记录有效期内（起止缺失视为开放）
    pub fn covers(&self, date: NaiveDate) -> bool {
        let after_start = self.start_date.map_or(true, |s| s <= date);
        let before_end = self.end_date.map_or(true, |e| date <= e);
        after_start && before_end
    }
}

// ==========================================
// ExternalSnapshot - 外部记录只读快照
// ==========================================
// 每次调用传入一份不可变快照, 引擎不做缓存
#[derive(Debug, Clone, Default)]
pub struct ExternalSnapshot {
    records: Vec<ExternalRecord>,
    by_id: HashMap<u64, usize>,
}

impl ExternalSnapshot {
    pub fn new(records: Vec<ExternalRecord>) -> Self {
        let by_id = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.id, idx))
            .collect();
        Self { records, by_id }
    }

    pub fn get(&self, id: u64) -> Option<&ExternalRecord> {
        self.by_id.get(&id).map(|&idx| &self.records[idx])
    }

    /// 按 ID 文本查找（允许 "12345.0"）
    pub fn get_by_text(&self, id: &str) -> Option<&ExternalRecord> {
        let trimmed = id.trim();
        let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        digits.parse::<u64>().ok().and_then(|id| self.get(id))
    }

    pub fn records(&self) -> &[ExternalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_month_validation() {
        assert!(TargetMonth::new(13, 2025).is_err());
        assert!(TargetMonth::new(0, 2025).is_err());
        let target = TargetMonth::new(2, 2025).unwrap();
        assert_eq!(target.first_day(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(
            TargetMonth::new(1, 2026).unwrap().ordinal() - target.ordinal(),
            11
        );
    }

    #[test]
    fn test_ensure_identity() {
        let record = SpecRecord::new("  ", FrequencyClass::RecurringWeekly, "Monday", 7);
        assert_eq!(
            record.ensure_identity(),
            Err(EngineError::MissingIdentityField {
                row: 7,
                field: "brand".to_string()
            })
        );
    }

    #[test]
    fn test_external_covers_open_ended() {
        let mut record = ExternalRecord::new(1, "Kiva");
        record.start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let d = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        assert!(record.covers(d));
        record.end_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        assert!(!record.covers(d));
    }

    #[test]
    fn test_snapshot_lookup_by_text() {
        let snapshot = ExternalSnapshot::new(vec![ExternalRecord::new(12345, "Kiva")]);
        assert!(snapshot.get_by_text("12345.0").is_some());
        assert!(snapshot.get_by_text(" 12345 ").is_some());
        assert!(snapshot.get_by_text("abc").is_none());
    }
}
