// ==========================================
// 促销日历对账系统 - 对账审计
// ==========================================
// 职责:
//   - run_maudit: 计划表 → 外部系统, 按 ID 对照核心字段
//   - find_zombie_conflicts: 外部系统内部, 同 (品牌, 周几) 多条有效记录
//   - find_sheet_conflicts: 计划表内部, 跨分区的 (品牌, 日期) 重叠
// 红线: 审计只读, 结果全部以结构化分组返回, 不抛业务错误
// ==========================================

use crate::config::{OverrideTables, ValidationConfig};
use crate::domain::deal::{ExternalRecord, ExternalSnapshot, SpecRecord, TargetMonth};
use crate::domain::types::FrequencyClass;
use crate::domain::validation::{FieldResult, ValidationField, ValidationRecord};
use crate::engine::date_expander::DateExpander;
use crate::engine::location_resolver::LocationResolver;
use crate::engine::multi_day::merge_multi_day;
use crate::engine::tagged_id::TaggedIdCodec;
use crate::engine::validation::FieldValidationEngine;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::{debug, info, instrument};

/// 标签无法解析时, 从单元格中兜底提取 5-7 位数字 ID
static LOOSE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5,7})\b").expect("valid loose id regex"));

/// MAudit 比较的字段
const MAUDIT_FIELDS: [ValidationField; 3] = [
    ValidationField::Discount,
    ValidationField::VendorContribution,
    ValidationField::Locations,
];

// ==========================================
// MAudit 结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub row: usize,
    pub section: FrequencyClass,
    pub brand: String,
    pub recurrence: String,
    pub discount: String,
    pub locations: String,
    pub external_id: Option<String>,
    pub external: Option<ExternalRecord>,
    pub issues: Vec<FieldResult>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MauditReport {
    pub verified: Vec<AuditEntry>,
    pub mismatches: Vec<AuditEntry>,
    pub not_found: Vec<AuditEntry>,
    pub missing_id: Vec<AuditEntry>,
}

// ==========================================
// 外部系统重复记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZombieRow {
    pub external_id: u64,
    pub brand: String,
    pub categories: String,
    pub discount: String,
    pub weekday: String,
    pub locations: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZombieGroup {
    pub fingerprint: String, // "brand|weekday" 小写
    pub title: String,
    pub count: usize,
    pub rows: Vec<ZombieRow>,
}

// ==========================================
// 计划表跨分区冲突
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConflictEntry {
    pub brand: String,
    pub section: FrequencyClass,
    pub row: usize,
    pub recurrence: String,
    pub discount: String,
    pub vendor_contribution: String,
    pub external_id_cell: String,
    pub locations: String,
    pub notes: String,
    pub dates: Vec<NaiveDate>,
    pub is_multi_day: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateConflict {
    pub brand: String,
    pub date: NaiveDate,
    pub sections: Vec<FrequencyClass>,
    pub count: usize,
    pub entries: Vec<SheetConflictEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandConflict {
    pub brand: String,
    pub sections: Vec<FrequencyClass>,
    pub count: usize,
    pub entries: Vec<SheetConflictEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConflictReport {
    pub date_conflicts: Vec<DateConflict>,
    pub brand_conflicts: Vec<BrandConflict>,
    pub section_counts: BTreeMap<FrequencyClass, usize>,
    pub unique_brands: usize,
}

// ==========================================
// Auditor - 审计器
// ==========================================
pub struct Auditor<'a> {
    validator: FieldValidationEngine,
    resolver: LocationResolver<'a>,
}

impl Auditor<'static> {
    pub fn builtin(config: &ValidationConfig) -> Self {
        Self {
            validator: FieldValidationEngine::new(config),
            resolver: LocationResolver::builtin(),
        }
    }
}

impl<'a> Auditor<'a> {
    pub fn new(config: &ValidationConfig, tables: &'a OverrideTables) -> Self {
        Self {
            validator: FieldValidationEngine::new(config),
            resolver: LocationResolver::new(tables),
        }
    }

    /// 计划表 → 外部系统 审计
    ///
    /// # 规则
    /// - 无 ID → missing_id
    /// - 取本分区第一个 ID（无则取首个 ID, 再无则兜底提取 5-7 位数字）
    /// - 快照中找不到 → not_found
    /// - 折扣 / 供应商比例 / 门店 任一不一致 → mismatches, 否则 verified
    /// - 计划表未填写的字段不参与比较
    #[instrument(skip(self, records, snapshot), fields(records = records.len(), externals = snapshot.len()))]
    pub fn run_maudit(&self, records: &[SpecRecord], snapshot: &ExternalSnapshot) -> MauditReport {
        let mut report = MauditReport::default();

        for record in records.iter().filter(|r| !r.brand.trim().is_empty()) {
            let mut entry = AuditEntry {
                row: record.origin.first_row(),
                section: record.frequency_class,
                brand: record.brand.clone(),
                recurrence: record.recurrence.clone(),
                discount: record.discount.clone(),
                locations: self.resolver.resolve(&record.location_spec).display(),
                external_id: None,
                external: None,
                issues: Vec::new(),
                note: None,
            };

            if is_blank_cell(&record.external_id_cell) {
                report.missing_id.push(entry);
                continue;
            }

            let Some(id) = first_usable_id(record) else {
                entry.note = Some("无法解析外部 ID".to_string());
                report.missing_id.push(entry);
                continue;
            };
            entry.external_id = Some(id.clone());

            let Some(external) = snapshot.get_by_text(&id) else {
                report.not_found.push(entry);
                continue;
            };

            let source = self.spec_validation_record(record);
            let target = self.external_validation_record(external);
            let fields: Vec<ValidationField> = MAUDIT_FIELDS
                .iter()
                .copied()
                .filter(|f| !source.value(*f).is_blank())
                .collect();

            entry.issues = self
                .validator
                .compare_fields(&source, &target, &fields)
                .into_iter()
                .filter(|r| r.is_issue())
                .collect();
            entry.external = Some(external.clone());

            if entry.issues.is_empty() {
                report.verified.push(entry);
            } else {
                debug!(row = entry.row, id = %id, issues = entry.issues.len(), "字段不一致");
                report.mismatches.push(entry);
            }
        }

        info!(
            verified = report.verified.len(),
            mismatches = report.mismatches.len(),
            not_found = report.not_found.len(),
            missing_id = report.missing_id.len(),
            "MAudit 完成"
        );
        report
    }

    /// 外部系统重复记录: as_of 当日有效的记录按 (品牌, 周几) 分组, 保留多于 1 条的分组
    ///
    /// 结果按记录数降序
    #[instrument(skip(self, snapshot), fields(externals = snapshot.len(), as_of = %as_of))]
    pub fn find_zombie_conflicts(
        &self,
        snapshot: &ExternalSnapshot,
        as_of: NaiveDate,
    ) -> Vec<ZombieGroup> {
        let mut grouped: BTreeMap<String, Vec<ZombieRow>> = BTreeMap::new();
        let mut order: Vec<String> = Vec::new();

        for record in snapshot.records().iter().filter(|r| r.covers(as_of)) {
            let brand = non_blank_or(&record.brand, "N/A");
            let weekday = non_blank_or(&record.weekday, "All");
            let fingerprint = format!("{}|{}", brand, weekday).to_lowercase();

            if !grouped.contains_key(&fingerprint) {
                order.push(fingerprint.clone());
            }
            grouped.entry(fingerprint).or_default().push(ZombieRow {
                external_id: record.id,
                brand,
                categories: non_blank_or(&record.categories, "N/A"),
                discount: non_blank_or(&record.discount, "0"),
                weekday,
                locations: self.resolver.resolve(&record.locations).display(),
                start_date: record.start_date,
                end_date: record.end_date,
            });
        }

        let mut groups: Vec<ZombieGroup> = order
            .into_iter()
            .filter_map(|fingerprint| {
                let rows = grouped.remove(&fingerprint)?;
                if rows.len() <= 1 {
                    return None;
                }
                let discounts: BTreeSet<&str> = rows.iter().map(|r| r.discount.as_str()).collect();
                let title = format!(
                    "{} ({}) - [{}]",
                    rows[0].brand,
                    rows[0].weekday,
                    truncate_summary(&discounts.into_iter().collect::<Vec<_>>().join(" vs "))
                );
                Some(ZombieGroup {
                    fingerprint,
                    title,
                    count: rows.len(),
                    rows,
                })
            })
            .collect();

        // 稳定排序, 同数量保持首次出现顺序
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        info!(groups = groups.len(), "外部系统重复记录检查完成");
        groups
    }

    /// 计划表跨分区冲突
    ///
    /// # 返回
    /// - date_conflicts: 同品牌同日期出现多次
    /// - brand_conflicts: 同品牌出现在多个分区（不看日期）
    #[instrument(skip(self, records), fields(records = records.len(), month = target.month, year = target.year))]
    pub fn find_sheet_conflicts(
        &self,
        records: &[SpecRecord],
        target: TargetMonth,
    ) -> SheetConflictReport {
        let merged = merge_multi_day(records.to_vec());

        let mut by_date: BTreeMap<(String, NaiveDate), Vec<SheetConflictEntry>> = BTreeMap::new();
        let mut by_brand: BTreeMap<String, Vec<SheetConflictEntry>> = BTreeMap::new();
        let mut section_counts: BTreeMap<FrequencyClass, usize> = BTreeMap::new();

        for record in merged.iter().filter(|r| !r.brand.trim().is_empty()) {
            let dates: Vec<NaiveDate> = DateExpander::expand(record, target).into_iter().collect();
            let entry = SheetConflictEntry {
                brand: record.brand.trim().to_string(),
                section: record.frequency_class,
                row: record.origin.first_row(),
                recurrence: record.recurrence.clone(),
                discount: record.discount.clone(),
                vendor_contribution: record.vendor_contribution.clone(),
                external_id_cell: record.external_id_cell.clone(),
                locations: self.resolver.resolve(&record.location_spec).display(),
                notes: record.notes.clone(),
                is_multi_day: record.origin.row_numbers.len() > 1,
                dates: dates.clone(),
            };

            *section_counts.entry(record.frequency_class).or_insert(0) += 1;
            let brand_key = entry.brand.to_lowercase();
            for date in dates {
                by_date
                    .entry((brand_key.clone(), date))
                    .or_default()
                    .push(entry.clone());
            }
            by_brand.entry(brand_key).or_default().push(entry);
        }

        let date_conflicts: Vec<DateConflict> = by_date
            .into_iter()
            .filter(|(_, entries)| entries.len() > 1)
            .map(|((_, date), entries)| DateConflict {
                brand: entries[0].brand.clone(),
                date,
                sections: sections_of(&entries),
                count: entries.len(),
                entries,
            })
            .collect();

        let unique_brands = by_brand.len();
        let brand_conflicts: Vec<BrandConflict> = by_brand
            .into_values()
            .filter(|entries| sections_of(entries).len() > 1)
            .map(|entries| BrandConflict {
                brand: entries[0].brand.clone(),
                sections: sections_of(&entries),
                count: entries.len(),
                entries,
            })
            .collect();

        info!(
            date_conflicts = date_conflicts.len(),
            brand_conflicts = brand_conflicts.len(),
            unique_brands = unique_brands,
            "计划表跨分区冲突检查完成"
        );

        SheetConflictReport {
            date_conflicts,
            brand_conflicts,
            section_counts,
            unique_brands,
        }
    }

    /// 计划表记录 → 校验记录
    pub fn spec_validation_record(&self, record: &SpecRecord) -> ValidationRecord {
        ValidationRecord {
            discount: record.discount.clone(),
            vendor_contribution: record.vendor_contribution.clone(),
            brand: record.brand.clone(),
            locations: self.resolver.resolve(&record.location_spec).names(),
            start_date: record.contract_start.map(|d| d.to_string()).unwrap_or_default(),
            end_date: record.contract_end.map(|d| d.to_string()).unwrap_or_default(),
            active_days: match record.frequency_class {
                FrequencyClass::RecurringWeekly => split_list(&record.recurrence),
                _ => Vec::new(),
            },
            categories: split_list(&record.category_spec),
            rebate_type: record.rebate_type.clone(),
        }
    }

    /// 外部记录 → 校验记录
    pub fn external_validation_record(&self, record: &ExternalRecord) -> ValidationRecord {
        ValidationRecord {
            discount: record.discount.clone(),
            vendor_contribution: record.vendor_contribution.clone(),
            brand: record.brand.clone(),
            locations: self.resolver.resolve(&record.locations).names(),
            start_date: record.start_date.map(|d| d.to_string()).unwrap_or_default(),
            end_date: record.end_date.map(|d| d.to_string()).unwrap_or_default(),
            active_days: split_list(&record.weekday),
            categories: split_list(&record.categories),
            rebate_type: record.rebate_type.clone(),
        }
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn first_usable_id(record: &SpecRecord) -> Option<String> {
    let cell = TaggedIdCodec::parse(&record.external_id_cell);
    cell.for_section(record.frequency_class)
        .first()
        .map(|e| e.id.clone())
        .or_else(|| cell.first_id().map(|id| id.to_string()))
        .or_else(|| {
            LOOSE_ID_RE
                .captures(&record.external_id_cell)
                .map(|caps| caps[1].to_string())
        })
}

fn is_blank_cell(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "" | "nan" | "none" | "-")
}

fn non_blank_or(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate_summary(text: &str) -> String {
    if text.chars().count() > 50 {
        format!("{}...", text.chars().take(47).collect::<String>())
    } else {
        text.to_string()
    }
}

fn sections_of(entries: &[SheetConflictEntry]) -> Vec<FrequencyClass> {
    entries
        .iter()
        .map(|e| e.section)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FieldStatus;

    fn auditor() -> Auditor<'static> {
        Auditor::builtin(&ValidationConfig::default())
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn external(id: u64, brand: &str, discount: &str, locations: &str) -> ExternalRecord {
        let mut record = ExternalRecord::new(id, brand);
        record.discount = discount.to_string();
        record.locations = locations.to_string();
        record
    }

    #[test]
    fn test_maudit_buckets() {
        let records = vec![
            SpecRecord::new("Kiva", FrequencyClass::RecurringWeekly, "Monday", 2)
                .with_discount("20%")
                .with_locations("Davis, Dixon")
                .with_external_id_cell("W1: 12345"),
            SpecRecord::new("Wyld", FrequencyClass::RecurringWeekly, "Tuesday", 3)
                .with_discount("20%")
                .with_external_id_cell("W1: 22222"),
            SpecRecord::new("Camino", FrequencyClass::RecurringWeekly, "Friday", 4)
                .with_discount("30%")
                .with_external_id_cell("W1: 33333"),
            SpecRecord::new("Stiiizy", FrequencyClass::RecurringWeekly, "Sunday", 5),
            SpecRecord::new("", FrequencyClass::RecurringWeekly, "Sunday", 6),
        ];
        let snapshot = ExternalSnapshot::new(vec![
            external(12345, "Kiva", "0.20", "Dixon, Davis"),
            external(33333, "Camino", "25%", "All Locations"),
        ]);

        let report = auditor().run_maudit(&records, &snapshot);
        assert_eq!(report.verified.len(), 1);
        assert_eq!(report.verified[0].brand, "Kiva");
        assert_eq!(report.not_found.len(), 1);
        assert_eq!(report.not_found[0].external_id.as_deref(), Some("22222"));
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].issues[0].field, ValidationField::Discount);
        assert_eq!(report.mismatches[0].issues[0].status, FieldStatus::Mismatch);
        assert_eq!(report.missing_id.len(), 1);
    }

    #[test]
    fn test_maudit_loose_id_fallback() {
        let records = vec![SpecRecord::new("Kiva", FrequencyClass::OneOffSale, "3/3/2025", 2)
            .with_external_id_cell("see 123456 (old)")];
        let snapshot = ExternalSnapshot::new(vec![external(123456, "Kiva", "", "")]);
        let report = auditor().run_maudit(&records, &snapshot);
        assert_eq!(report.verified.len(), 1);
        assert_eq!(report.verified[0].external_id.as_deref(), Some("123456"));
    }

    #[test]
    fn test_zombie_conflicts() {
        let mut a = external(1, "Kiva", "20%", "");
        a.weekday = "Monday".to_string();
        let mut b = external(2, "kiva", "25%", "");
        b.weekday = "monday".to_string();
        let mut expired = external(3, "Kiva", "30%", "");
        expired.weekday = "Monday".to_string();
        expired.end_date = Some(d(1));
        let single = external(4, "Wyld", "10%", "");

        let snapshot = ExternalSnapshot::new(vec![a, b, expired, single]);
        let groups = auditor().find_zombie_conflicts(&snapshot, d(15));

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].fingerprint, "kiva|monday");
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].title, "Kiva (Monday) - [20% vs 25%]");
    }

    #[test]
    fn test_truncate_summary() {
        let long = "x".repeat(60);
        let summary = truncate_summary(&long);
        assert_eq!(summary.chars().count(), 50);
        assert!(summary.ends_with("..."));
        assert_eq!(truncate_summary("20%"), "20%");
    }

    #[test]
    fn test_sheet_conflicts() {
        let records = vec![
            SpecRecord::new("Kiva", FrequencyClass::RecurringWeekly, "Monday", 2),
            SpecRecord::new("Kiva", FrequencyClass::RecurringWeekly, "Friday", 3),
            SpecRecord::new("Kiva", FrequencyClass::RecurringMonthly, "3rd", 2),
            SpecRecord::new("Wyld", FrequencyClass::OneOffSale, "3/10/2025", 2),
        ];
        let report = auditor().find_sheet_conflicts(&records, TargetMonth::new(3, 2025).unwrap());

        assert_eq!(report.unique_brands, 2);
        assert_eq!(report.section_counts[&FrequencyClass::RecurringWeekly], 1);
        assert_eq!(report.date_conflicts.len(), 1);
        assert_eq!(report.date_conflicts[0].date, d(3));
        assert_eq!(
            report.date_conflicts[0].sections,
            vec![FrequencyClass::RecurringWeekly, FrequencyClass::RecurringMonthly]
        );
        assert!(report.date_conflicts[0].entries[0].is_multi_day);
        assert_eq!(report.brand_conflicts.len(), 1);
        assert_eq!(report.brand_conflicts[0].brand, "Kiva");
    }
}
