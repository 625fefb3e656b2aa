// ==========================================
// 促销日历对账系统 - 多日合并
// ==========================================
// 职责: 仅周几不同的周循环行合并为一个逻辑促销
// 工具: sha2 生成稳定分组 ID（前 12 位十六进制）
// ==========================================

use crate::domain::deal::SpecRecord;
use crate::domain::types::FrequencyClass;
use crate::engine::date_expander::DateExpander;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// 缺少周几时的占位
pub const MISSING_WEEKDAY: &str = "MISSING";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDayGroup {
    pub group_id: String,
    pub brand: String,
    pub row_numbers: Vec<usize>,
    pub weekdays: Vec<String>, // 缺失时为 MISSING
    pub has_missing_weekday: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDayGrouping {
    pub groups: BTreeMap<String, MultiDayGroup>, // 只含 2 行及以上的分组
    pub row_to_group: HashMap<usize, String>,
}

/// 分组键（除周几以外的全部业务字段）
pub fn group_key(record: &SpecRecord) -> String {
    let fmt_date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    let raw = [
        record.brand.trim().to_lowercase(),
        record.discount.trim().to_lowercase(),
        record.vendor_contribution.trim().to_lowercase(),
        record.location_spec.trim().to_lowercase(),
        record.category_spec.trim().to_lowercase(),
        record.notes.trim().to_lowercase(),
        record.deal_info.trim().to_lowercase(),
        fmt_date(record.contract_start),
        fmt_date(record.contract_end),
    ]
    .join("|");

    let digest = Sha256::digest(raw.as_bytes());
    digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(12)
        .collect()
}

/// 识别多日分组（只看周循环记录）
pub fn group_multi_day(records: &[SpecRecord]) -> MultiDayGrouping {
    let mut buckets: BTreeMap<String, Vec<&SpecRecord>> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| r.frequency_class == FrequencyClass::RecurringWeekly)
    {
        buckets.entry(group_key(record)).or_default().push(record);
    }

    let mut grouping = MultiDayGrouping::default();
    for (group_id, members) in buckets {
        if members.len() < 2 {
            continue;
        }

        let mut row_numbers = Vec::new();
        let mut weekdays = Vec::new();
        let mut has_missing_weekday = false;
        for member in &members {
            row_numbers.extend(member.origin.row_numbers.iter().copied());
            let day = member.recurrence.trim();
            if day.is_empty() || DateExpander::parse_weekdays(day).is_empty() {
                has_missing_weekday = true;
                weekdays.push(MISSING_WEEKDAY.to_string());
            } else {
                weekdays.push(day.to_string());
            }
        }

        for row in &row_numbers {
            grouping.row_to_group.insert(*row, group_id.clone());
        }

        debug!(group_id = %group_id, rows = ?row_numbers, "识别到多日分组");
        grouping.groups.insert(
            group_id.clone(),
            MultiDayGroup {
                group_id,
                brand: members[0].brand.clone(),
                row_numbers,
                weekdays,
                has_missing_weekday,
            },
        );
    }

    grouping
}

/// 合并多日分组: 每组保留首行, 周几合并, 来源行号合并
///
/// 非周循环记录和单行分组原样保留, 顺序按首次出现
pub fn merge_multi_day(records: Vec<SpecRecord>) -> Vec<SpecRecord> {
    let grouping = group_multi_day(&records);
    let mut merged: Vec<SpecRecord> = Vec::with_capacity(records.len());
    let mut group_slot: HashMap<String, usize> = HashMap::new();

    for record in records {
        let group_id = record
            .origin
            .row_numbers
            .first()
            .and_then(|row| grouping.row_to_group.get(row))
            .filter(|_| record.frequency_class == FrequencyClass::RecurringWeekly)
            .cloned();

        let Some(group_id) = group_id else {
            merged.push(record);
            continue;
        };

        match group_slot.get(&group_id) {
            Some(&idx) => {
                let head = &mut merged[idx];
                let day = record.recurrence.trim();
                let covered = DateExpander::parse_weekdays(day)
                    .is_subset(&DateExpander::parse_weekdays(&head.recurrence));
                if !day.is_empty() && !covered {
                    head.recurrence = if head.recurrence.trim().is_empty() {
                        day.to_string()
                    } else {
                        format!("{}, {}", head.recurrence.trim(), day)
                    };
                }
                head.origin.row_numbers.extend(record.origin.row_numbers);
                if head.external_id_cell.trim().is_empty() {
                    head.external_id_cell = record.external_id_cell;
                }
            }
            None => {
                group_slot.insert(group_id, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn weekly(brand: &str, day: &str, row: usize) -> SpecRecord {
        SpecRecord::new(brand, FrequencyClass::RecurringWeekly, day, row)
            .with_discount("20%")
            .with_locations("All Locations")
    }

    #[test]
    fn test_group_key_is_stable_and_short() {
        let a = group_key(&weekly("Kiva", "Monday", 2));
        let b = group_key(&weekly("Kiva", "Friday", 9));
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, group_key(&weekly("Wyld", "Monday", 2)));
    }

    #[test]
    fn test_group_multi_day_flags_missing_weekday() {
        let records = vec![
            weekly("Kiva", "Monday", 2),
            weekly("Kiva", "", 3),
            weekly("Wyld", "Tuesday", 4),
        ];
        let grouping = group_multi_day(&records);
        assert_eq!(grouping.groups.len(), 1);
        let group = grouping.groups.values().next().unwrap();
        assert_eq!(group.row_numbers, vec![2, 3]);
        assert!(group.has_missing_weekday);
        assert_eq!(group.weekdays, vec!["Monday", MISSING_WEEKDAY]);
        assert!(!grouping.row_to_group.contains_key(&4));
    }

    #[test]
    fn test_merge_multi_day() {
        let records = vec![
            weekly("Kiva", "Monday", 2),
            weekly("Wyld", "Tuesday", 3),
            weekly("Kiva", "Friday", 4).with_external_id_cell("W1: 77"),
        ];
        let merged = merge_multi_day(records);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].recurrence, "Monday, Friday");
        assert_eq!(merged[0].origin.row_numbers, vec![2, 4]);
        assert_eq!(merged[0].external_id_cell, "W1: 77");
        assert_eq!(merged[1].brand, "Wyld");
    }

    #[test]
    fn test_merge_keeps_weekday_hidden_in_head_text() {
        // "tu" 是 "saturday" 的子串, 但代表周二
        let records = vec![weekly("Kiva", "saturday", 2), weekly("Kiva", "tu", 3)];
        let merged = merge_multi_day(records);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].origin.row_numbers, vec![2, 3]);
        assert_eq!(
            DateExpander::parse_weekdays(&merged[0].recurrence),
            [Weekday::Sat, Weekday::Tue].into_iter().collect()
        );
    }

    #[test]
    fn test_merge_skips_repeated_weekday() {
        let records = vec![weekly("Kiva", "Monday", 2), weekly("Kiva", "Mon", 3)];
        let merged = merge_multi_day(records);
        assert_eq!(merged[0].recurrence, "Monday");
        assert_eq!(merged[0].origin.row_numbers, vec![2, 3]);
    }

    #[test]
    fn test_monthly_rows_never_grouped() {
        let records = vec![
            SpecRecord::new("Kiva", FrequencyClass::RecurringMonthly, "1st", 2),
            SpecRecord::new("Kiva", FrequencyClass::RecurringMonthly, "15th", 3),
        ];
        assert!(group_multi_day(&records).groups.is_empty());
        assert_eq!(merge_multi_day(records).len(), 2);
    }
}
