// ==========================================
// 促销日历对账系统 - 领域类型定义
// ==========================================
// 职责: 频次分类、严重度、状态等枚举
// 红线: 等级制判定,不是评分制（评分只在匹配打分器内部使用）
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 频次分类 (Frequency Class)
// ==========================================
// 每日周循环 / 每月固定日 / 一次性促销
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencyClass {
    RecurringWeekly,  // 周循环 (Tier 2)
    RecurringMonthly, // 月循环 (Tier 1)
    OneOffSale,       // 一次性 (Tier 1)
}

impl FrequencyClass {
    /// 从分区键解析频次分类
    ///
    /// # 规则
    /// - weekly / recurring_weekly → RecurringWeekly
    /// - monthly / recurring_monthly → RecurringMonthly
    /// - sale / one_off_sale / one-off → OneOffSale
    /// - 其他 → UnknownFrequencyClass 错误（配置/契约错误,不做降级）
    pub fn parse(key: &str) -> EngineResult<Self> {
        let normalized = key.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "weekly" | "recurring_weekly" => Ok(FrequencyClass::RecurringWeekly),
            "monthly" | "recurring_monthly" => Ok(FrequencyClass::RecurringMonthly),
            "sale" | "one_off" | "one_off_sale" | "oneoff" => Ok(FrequencyClass::OneOffSale),
            _ => Err(EngineError::UnknownFrequencyClass(key.to_string())),
        }
    }

    /// 所属层级
    pub fn tier(&self) -> DealTier {
        match self {
            FrequencyClass::RecurringWeekly => DealTier::Subordinate,
            FrequencyClass::RecurringMonthly | FrequencyClass::OneOffSale => DealTier::Dominant,
        }
    }

    /// 标签槽位使用的分区字母 (W/M/S)
    pub fn section_letter(&self) -> char {
        match self {
            FrequencyClass::RecurringWeekly => 'W',
            FrequencyClass::RecurringMonthly => 'M',
            FrequencyClass::OneOffSale => 'S',
        }
    }
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyClass::RecurringWeekly => write!(f, "RECURRING_WEEKLY"),
            FrequencyClass::RecurringMonthly => write!(f, "RECURRING_MONTHLY"),
            FrequencyClass::OneOffSale => write!(f, "ONE_OFF_SALE"),
        }
    }
}

// ==========================================
// 促销层级 (Deal Tier)
// ==========================================
// 红线: 同品牌同日期同门店冲突时, Dominant 获胜, Subordinate 必须让出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealTier {
    Dominant,    // Tier 1 (月循环 / 一次性)
    Subordinate, // Tier 2 (周循环)
}

impl fmt::Display for DealTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealTier::Dominant => write!(f, "DOMINANT"),
            DealTier::Subordinate => write!(f, "SUBORDINATE"),
        }
    }
}

// ==========================================
// 冲突类型 (Location Conflict)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    None,    // 门店无交集
    Partial, // 部分门店冲突, 剩余门店可继续
    Full,    // 下级促销门店被完全覆盖
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::None => write!(f, "NONE"),
            ConflictKind::Partial => write!(f, "PARTIAL"),
            ConflictKind::Full => write!(f, "FULL"),
        }
    }
}

// ==========================================
// 匹配状态 (Match Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    High,   // 自动选中
    Medium, // 给出候选建议
    Low,    // 无可信匹配
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::High => write!(f, "HIGH"),
            MatchStatus::Medium => write!(f, "MEDIUM"),
            MatchStatus::Low => write!(f, "LOW"),
        }
    }
}

// ==========================================
// 校验严重度 / 字段状态 / 总体结论
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical, // 不一致即 FAIL
    Advisory, // 不一致仅 WARN
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Advisory => write!(f, "ADVISORY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    Match,
    Mismatch,
    Missing,
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldStatus::Match => write!(f, "MATCH"),
            FieldStatus::Mismatch => write!(f, "MISMATCH"),
            FieldStatus::Missing => write!(f, "MISSING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Warn => write!(f, "WARN"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_class_parse() {
        assert_eq!(
            FrequencyClass::parse("weekly").unwrap(),
            FrequencyClass::RecurringWeekly
        );
        assert_eq!(
            FrequencyClass::parse("Monthly").unwrap(),
            FrequencyClass::RecurringMonthly
        );
        assert_eq!(
            FrequencyClass::parse("one-off sale").unwrap(),
            FrequencyClass::OneOffSale
        );
        assert!(matches!(
            FrequencyClass::parse("quarterly"),
            Err(EngineError::UnknownFrequencyClass(_))
        ));
    }

    #[test]
    fn test_tier_assignment() {
        assert_eq!(FrequencyClass::RecurringWeekly.tier(), DealTier::Subordinate);
        assert_eq!(FrequencyClass::RecurringMonthly.tier(), DealTier::Dominant);
        assert_eq!(FrequencyClass::OneOffSale.tier(), DealTier::Dominant);
    }

    #[test]
    fn test_verdict_ordering() {
        assert!(Verdict::Fail > Verdict::Warn);
        assert!(Verdict::Warn > Verdict::Pass);
        assert_eq!(Verdict::Fail.to_string(), "FAIL");
    }
}
