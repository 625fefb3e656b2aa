// ==========================================
// 促销日历对账系统 - 日期展开
// ==========================================
// 职责: 周期文本 + 目标月份 → 具体日期集合
// 红线: 无法识别的文本返回空集合, 不抛错
// ==========================================

use crate::domain::deal::{SpecRecord, TargetMonth};
use crate::domain::types::FrequencyClass;
use chrono::{Datelike, Local, NaiveDate, Weekday};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid ordinal regex"));

static FULL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{4}|\d{2})\b").expect("valid full date regex")
});

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid iso date regex"));

static BARE_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2})\s*$").expect("valid bare day regex"));

static MULTI_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[,&;]|\band\b").expect("valid multi split regex"));

static WEEKDAY_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[,&;/|\s]+|\band\b").expect("valid weekday split regex"));

static MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s*'?(\d{4}|\d{2})\b").expect("valid month year regex")
});

static CONTRACT_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}/\d{1,2}/(?:\d{4}|\d{2}))\s*[-–—to]+\s*(\d{1,2}/\d{1,2}/(?:\d{4}|\d{2}))")
        .expect("valid contract range regex")
});

/// 周几别名
const WEEKDAY_ALIASES: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("mon", Weekday::Mon),
    ("mo", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("tues", Weekday::Tue),
    ("tue", Weekday::Tue),
    ("tu", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("wed", Weekday::Wed),
    ("we", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("thurs", Weekday::Thu),
    ("thur", Weekday::Thu),
    ("thu", Weekday::Thu),
    ("th", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("fri", Weekday::Fri),
    ("fr", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sat", Weekday::Sat),
    ("sa", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("sun", Weekday::Sun),
    ("su", Weekday::Sun),
];

const MONTH_NAMES: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

// ==========================================
// DateExpander - 日期展开
// ==========================================
pub struct DateExpander;

impl DateExpander {
    /// 展开一条计划表记录在目标月份内的促销日期
    pub fn expand(record: &SpecRecord, target: TargetMonth) -> BTreeSet<NaiveDate> {
        match record.frequency_class {
            FrequencyClass::RecurringWeekly => Self::expand_weekly(&record.recurrence, target),
            FrequencyClass::RecurringMonthly => Self::expand_monthly(&record.recurrence, target),
            FrequencyClass::OneOffSale => Self::expand_one_off(&record.recurrence, target),
        }
    }

    /// 周循环: 文本中每个可识别的周几在目标月内的所有日期
    pub fn expand_weekly(text: &str, target: TargetMonth) -> BTreeSet<NaiveDate> {
        let weekdays = Self::parse_weekdays(text);
        month_days(target)
            .filter(|d| weekdays.contains(&d.weekday()))
            .collect()
    }

    /// 月循环: 序数日 / 纯数字日 / 完整日期, 超出当月天数的日子忽略
    pub fn expand_monthly(text: &str, target: TargetMonth) -> BTreeSet<NaiveDate> {
        let mut dates = BTreeSet::new();
        for part in MULTI_SPLIT_RE.split(text) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some(caps) = ORDINAL_RE.captures(part) {
                if let Some(d) = day_in_month(&caps[1], target) {
                    dates.insert(d);
                }
            } else if let Some(d) = parse_full_date(part) {
                dates.insert(d);
            } else if let Some(caps) = BARE_DAY_RE.captures(part) {
                if let Some(d) = day_in_month(&caps[1], target) {
                    dates.insert(d);
                }
            }
        }
        dates
    }

    /// 一次性: 完整日期优先, 否则按序数日解析; "- Weekday" 后缀忽略
    pub fn expand_one_off(text: &str, target: TargetMonth) -> BTreeSet<NaiveDate> {
        let mut dates = BTreeSet::new();
        for part in MULTI_SPLIT_RE.split(text) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some(d) = parse_full_date(part) {
                dates.insert(d);
            } else if let Some(caps) = ORDINAL_RE.captures(part) {
                if let Some(d) = day_in_month(&caps[1], target) {
                    dates.insert(d);
                }
            }
        }
        dates
    }

    /// 单个周几文本 → Weekday
    pub fn parse_weekday(text: &str) -> Option<Weekday> {
        let lower = text.trim().trim_end_matches('.').to_lowercase();
        WEEKDAY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, day)| *day)
    }

    /// 文本中所有可识别的周几
    pub fn parse_weekdays(text: &str) -> HashSet<Weekday> {
        WEEKDAY_SPLIT_RE
            .split(text)
            .filter_map(Self::parse_weekday)
            .collect()
    }

    /// 外部记录的周几字段在指定日期是否生效
    ///
    /// # 规则
    /// - 空白 / "all" / "all days" / "daily" / "everyday" → 每天生效
    /// - 否则该日期的周几出现在文本中才生效
    pub fn is_weekday_active(date: NaiveDate, weekday_text: &str) -> bool {
        let lower = weekday_text.trim().to_lowercase();
        if matches!(
            lower.as_str(),
            "" | "all" | "all days" | "daily" | "everyday" | "every day"
        ) {
            return true;
        }
        Self::parse_weekdays(&lower).contains(&date.weekday())
    }

    pub fn days_in_month(year: i32, month: u32) -> u32 {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .map(|d| d.day())
            .unwrap_or(0)
    }

    /// 宽松日期解析: ISO / M/D/YYYY / M-D-YY
    pub fn parse_date(text: &str) -> Option<NaiveDate> {
        let trimmed = text.trim();
        if let Some(caps) = ISO_DATE_RE.captures(trimmed) {
            return NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            );
        }
        parse_full_date(trimmed)
    }

    /// 合同期 "MM/DD/YY - MM/DD/YY" → (开始, 结束)
    pub fn parse_contract_range(text: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match CONTRACT_RANGE_RE.captures(text) {
            Some(caps) => (parse_full_date(&caps[1]), parse_full_date(&caps[2])),
            None => (None, None),
        }
    }

    /// 页签名 → (月, 年)
    ///
    /// # 规则
    /// - "December 2025" / "Dec 25" → 显式年份（两位年份 +2000）
    /// - 仅月份名 → 今年; 若该月已过则取明年
    /// - 无法识别 → fallback
    pub fn parse_tab_month_year(name: &str, fallback: TargetMonth) -> TargetMonth {
        let today = Local::now().date_naive();
        Self::parse_tab_month_year_at(name, fallback, today)
    }

    /// 同 parse_tab_month_year, 以指定日期为"今天"
    pub fn parse_tab_month_year_at(
        name: &str,
        fallback: TargetMonth,
        today: NaiveDate,
    ) -> TargetMonth {
        let lower = name.to_lowercase();

        if let Some(caps) = MONTH_YEAR_RE.captures(&lower) {
            if let (Some(month), Ok(year)) = (month_from_name(&caps[1]), caps[2].parse::<i32>()) {
                let year = if year < 100 { 2000 + year } else { year };
                if let Ok(target) = TargetMonth::new(month, year) {
                    return target;
                }
            }
        }

        let found = lower
            .split(|c: char| !c.is_alphabetic())
            .find_map(month_from_name);
        if let Some(month) = found {
            let year = if month < today.month() {
                today.year() + 1
            } else {
                today.year()
            };
            if let Ok(target) = TargetMonth::new(month, year) {
                return target;
            }
        }

        fallback
    }
}

fn month_days(target: TargetMonth) -> impl Iterator<Item = NaiveDate> {
    let days = DateExpander::days_in_month(target.year, target.month);
    (1..=days).filter_map(move |day| NaiveDate::from_ymd_opt(target.year, target.month, day))
}

fn day_in_month(day: &str, target: TargetMonth) -> Option<NaiveDate> {
    let day: u32 = day.parse().ok()?;
    if day == 0 || day > DateExpander::days_in_month(target.year, target.month) {
        return None;
    }
    NaiveDate::from_ymd_opt(target.year, target.month, day)
}

fn parse_full_date(text: &str) -> Option<NaiveDate> {
    let caps = FULL_DATE_RE.captures(text)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_from_name(token: &str) -> Option<u32> {
    let token = token.trim_end_matches('.');
    if token.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .find(|(name, _)| *name == token || (token.len() >= 3 && name.starts_with(token)))
        .map(|(_, month)| *month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(month: u32, year: i32) -> TargetMonth {
        TargetMonth::new(month, year).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weekly_mondays() {
        // 2025-03: 3, 10, 17, 24, 31 是周一
        let dates = DateExpander::expand_weekly("Monday", target(3, 2025));
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d(2025, 3, 3), d(2025, 3, 10), d(2025, 3, 17), d(2025, 3, 24), d(2025, 3, 31)]
        );
    }

    #[test]
    fn test_weekly_multiple_and_aliases() {
        let dates = DateExpander::expand_weekly("Mon, Thurs", target(3, 2025));
        assert_eq!(dates.len(), 9);
        assert!(dates.iter().all(|x| matches!(x.weekday(), Weekday::Mon | Weekday::Thu)));
    }

    #[test]
    fn test_unrecognized_weekday_is_empty() {
        assert!(DateExpander::expand_weekly("Someday", target(3, 2025)).is_empty());
    }

    #[test]
    fn test_weekly_dates_all_in_month() {
        for month in 1..=12 {
            let t = target(month, 2025);
            for date in DateExpander::expand_weekly("Sunday", t) {
                assert_eq!(date.month(), month);
                assert_eq!(date.year(), 2025);
                assert_eq!(date.weekday(), Weekday::Sun);
            }
        }
    }

    #[test]
    fn test_monthly_ordinals() {
        let dates = DateExpander::expand_monthly("1st & 15th", target(3, 2025));
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d(2025, 3, 1), d(2025, 3, 15)]
        );
    }

    #[test]
    fn test_monthly_out_of_range_day_ignored() {
        let dates = DateExpander::expand_monthly("30th", target(2, 2025));
        assert!(dates.is_empty());
        let dates = DateExpander::expand_monthly("29th", target(2, 2024));
        assert_eq!(dates.len(), 1);
    }

    #[test]
    fn test_monthly_bare_numbers_and_and() {
        let dates = DateExpander::expand_monthly("5 and 20", target(4, 2025));
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d(2025, 4, 5), d(2025, 4, 20)]
        );
    }

    #[test]
    fn test_one_off_full_date_and_suffix() {
        let dates = DateExpander::expand_one_off("4/20/25 - Sunday", target(4, 2025));
        assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![d(2025, 4, 20)]);
    }

    #[test]
    fn test_one_off_ordinal() {
        let dates = DateExpander::expand_one_off("20th", target(4, 2025));
        assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![d(2025, 4, 20)]);
    }

    #[test]
    fn test_is_weekday_active() {
        let monday = d(2025, 3, 3);
        assert!(DateExpander::is_weekday_active(monday, ""));
        assert!(DateExpander::is_weekday_active(monday, "All"));
        assert!(DateExpander::is_weekday_active(monday, "Monday, Friday"));
        assert!(!DateExpander::is_weekday_active(monday, "Tuesday"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(DateExpander::parse_date("2025-01-31"), Some(d(2025, 1, 31)));
        assert_eq!(DateExpander::parse_date("2025-01-31 00:00:00"), Some(d(2025, 1, 31)));
        assert_eq!(DateExpander::parse_date("1/31/2025"), Some(d(2025, 1, 31)));
        assert_eq!(DateExpander::parse_date("01/31/25"), Some(d(2025, 1, 31)));
        assert_eq!(DateExpander::parse_date("soon"), None);
    }

    #[test]
    fn test_contract_range() {
        let (start, end) = DateExpander::parse_contract_range("01/01/25 - 12/31/25");
        assert_eq!(start, Some(d(2025, 1, 1)));
        assert_eq!(end, Some(d(2025, 12, 31)));
        assert_eq!(DateExpander::parse_contract_range("10th"), (None, None));
    }

    #[test]
    fn test_tab_month_year() {
        let fallback = target(1, 2024);
        let today = d(2025, 6, 15);
        assert_eq!(
            DateExpander::parse_tab_month_year_at("December 2025", fallback, today),
            target(12, 2025)
        );
        assert_eq!(
            DateExpander::parse_tab_month_year_at("Dec 25", fallback, today),
            target(12, 2025)
        );
        // 月份已过 → 明年
        assert_eq!(
            DateExpander::parse_tab_month_year_at("March", fallback, today),
            target(3, 2026)
        );
        assert_eq!(
            DateExpander::parse_tab_month_year_at("Weekly", fallback, today),
            fallback
        );
    }
}
