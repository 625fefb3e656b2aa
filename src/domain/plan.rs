// ==========================================
// 促销日历对账系统 - 冲突拆分方案
// ==========================================
// 职责: 日期区间、拆分步骤、拆分方案
// 红线: 方案一经生成即不可变, 变化时重新生成而不是原地修补
// ==========================================

use crate::domain::location::LocationSet;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// DateRange - 闭区间
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// start > end 时返回 None（零长度区间被省略）
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.days()).map(move |offset| start + Duration::days(offset))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

// ==========================================
// PlanAction - 步骤动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanAction {
    CreatePart1, // 冲突前段, 新建
    Gap,         // 冲突期间完全暂停
    Patch,       // 冲突期间仅保留剩余门店, 复用原 ID
    CreatePart2, // 冲突后段, 新建
}

impl PlanAction {
    /// CREATE_* 步骤需要外部系统分配新 ID
    pub fn requires_new_id(&self) -> bool {
        matches!(self, PlanAction::CreatePart1 | PlanAction::CreatePart2)
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::CreatePart1 => write!(f, "CREATE_PART1"),
            PlanAction::Gap => write!(f, "GAP"),
            PlanAction::Patch => write!(f, "PATCH"),
            PlanAction::CreatePart2 => write!(f, "CREATE_PART2"),
        }
    }
}

// ==========================================
// ConflictPlanStep - 拆分步骤
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictPlanStep {
    CreatePart1 {
        range: DateRange,
        rationale: String,
    },
    Gap {
        range: DateRange,
        rationale: String,
    },
    Patch {
        range: DateRange,
        locations: LocationSet, // 冲突期间保留的门店
        rationale: String,
    },
    CreatePart2 {
        range: DateRange,
        rationale: String,
    },
}

impl ConflictPlanStep {
    pub fn action(&self) -> PlanAction {
        match self {
            ConflictPlanStep::CreatePart1 { .. } => PlanAction::CreatePart1,
            ConflictPlanStep::Gap { .. } => PlanAction::Gap,
            ConflictPlanStep::Patch { .. } => PlanAction::Patch,
            ConflictPlanStep::CreatePart2 { .. } => PlanAction::CreatePart2,
        }
    }

    pub fn range(&self) -> DateRange {
        match self {
            ConflictPlanStep::CreatePart1 { range, .. }
            | ConflictPlanStep::Gap { range, .. }
            | ConflictPlanStep::Patch { range, .. }
            | ConflictPlanStep::CreatePart2 { range, .. } => *range,
        }
    }

    pub fn rationale(&self) -> &str {
        match self {
            ConflictPlanStep::CreatePart1 { rationale, .. }
            | ConflictPlanStep::Gap { rationale, .. }
            | ConflictPlanStep::Patch { rationale, .. }
            | ConflictPlanStep::CreatePart2 { rationale, .. } => rationale,
        }
    }

    /// 仅 PATCH 步骤携带门店子集
    pub fn locations(&self) -> Option<&LocationSet> {
        match self {
            ConflictPlanStep::Patch { locations, .. } => Some(locations),
            _ => None,
        }
    }
}

// ==========================================
// ConflictPlan - 拆分方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPlan {
    brand: String,
    steps: Vec<ConflictPlanStep>,
}

impl ConflictPlan {
    pub fn new(brand: impl Into<String>, steps: Vec<ConflictPlanStep>) -> Self {
        Self {
            brand: brand.into(),
            steps,
        }
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn steps(&self) -> &[ConflictPlanStep] {
        &self.steps
    }

    pub fn actions(&self) -> Vec<PlanAction> {
        self.steps.iter().map(|s| s.action()).collect()
    }

    /// 日期所在的步骤
    pub fn step_for(&self, date: NaiveDate) -> Option<&ConflictPlanStep> {
        self.steps.iter().find(|s| s.range().contains(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(DateRange::new(d(5), d(4)).is_none());
        let range = DateRange::new(d(3), d(5)).unwrap();
        assert_eq!(range.days(), 3);
        assert_eq!(range.iter_days().collect::<Vec<_>>(), vec![d(3), d(4), d(5)]);
        assert!(range.contains(d(5)));
        assert!(!range.contains(d(6)));
    }

    #[test]
    fn test_plan_action_id_requirement() {
        assert!(PlanAction::CreatePart1.requires_new_id());
        assert!(PlanAction::CreatePart2.requires_new_id());
        assert!(!PlanAction::Patch.requires_new_id());
        assert!(!PlanAction::Gap.requires_new_id());
    }

    #[test]
    fn test_step_serialization_tag() {
        let step = ConflictPlanStep::Gap {
            range: DateRange::single(d(1)),
            rationale: "x".to_string(),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["action"], "GAP");
    }
}
