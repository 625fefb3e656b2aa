// ==========================================
// 促销日历对账系统 - 冲突拆分规划
// ==========================================
// 职责: 找出被同品牌上级促销打断的周循环促销, 生成拆分方案
// 红线: 拆分后任何日期上, 下级促销都不能与上级促销在同一门店同时生效
// 红线: 方案至多 3 段 (PART1 / GAP|PATCH / PART2), 零长度段省略
// ==========================================

use crate::config::OverrideTables;
use crate::domain::deal::{RowOrigin, SpecRecord, TargetMonth};
use crate::domain::location::LocationSet;
use crate::domain::plan::{ConflictPlan, ConflictPlanStep, DateRange};
use crate::domain::types::{ConflictKind, DealTier, FrequencyClass};
use crate::engine::brand::parse_multi_brand;
use crate::engine::date_expander::DateExpander;
use crate::engine::error::EngineResult;
use crate::engine::location_resolver::{classify_conflict, LocationConflict, LocationResolver};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

const MONTH_LABELS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

// ==========================================
// 输出结构
// ==========================================

/// 打断下级促销的上级促销
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptingDeal {
    pub brand: String,
    pub frequency_class: FrequencyClass,
    pub locations: LocationSet,
    pub dates: Vec<NaiveDate>, // 与下级促销冲突的日期
    pub origin: RowOrigin,
    pub external_id_cell: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRequirement {
    pub subordinate: SpecRecord,
    pub subordinate_locations: LocationSet,
    pub subordinate_dates: Vec<NaiveDate>,
    pub conflict_dates: Vec<NaiveDate>,
    pub conflict: LocationConflict,
    pub interrupting: Vec<InterruptingDeal>,
    pub plan: ConflictPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoConflictEntry {
    pub brand: String,
    pub origin: RowOrigin,
    pub subordinate_dates: Vec<NaiveDate>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub target: TargetMonth,
    pub date_context: String, // 例: "March 2025"
    pub splits_required: Vec<SplitRequirement>,
    pub no_conflict: Vec<NoConflictEntry>,
}

// 上级促销展开后的中间结构
struct DominantEntry<'r> {
    record: &'r SpecRecord,
    brands: BTreeSet<String>,
    dates: BTreeSet<NaiveDate>,
    locations: LocationSet,
}

// ==========================================
// ConflictPlanner - 冲突拆分规划器
// ==========================================
pub struct ConflictPlanner<'a> {
    resolver: LocationResolver<'a>,
}

impl ConflictPlanner<'static> {
    pub fn builtin() -> Self {
        Self {
            resolver: LocationResolver::builtin(),
        }
    }
}

impl<'a> ConflictPlanner<'a> {
    pub fn new(tables: &'a OverrideTables) -> Self {
        Self {
            resolver: LocationResolver::new(tables),
        }
    }

    /// 为目标月份生成全部拆分方案
    ///
    /// # 参数
    /// - records: 三个分区的计划表记录（周循环应已做多日合并）
    /// - target: 目标月份
    ///
    /// # 返回
    /// - Ok(PlanReport): 需拆分 / 无冲突 两类
    /// - Err(MissingIdentityField): 记录缺少品牌（调用方契约错误）
    #[instrument(skip(self, records), fields(records = records.len(), month = target.month, year = target.year))]
    pub fn build_plans(
        &self,
        records: &[SpecRecord],
        target: TargetMonth,
    ) -> EngineResult<PlanReport> {
        for record in records {
            record.ensure_identity()?;
        }

        let dominants: Vec<DominantEntry> = records
            .iter()
            .filter(|r| r.tier() == DealTier::Dominant)
            .map(|r| DominantEntry {
                record: r,
                brands: brand_keys(&r.brand),
                dates: DateExpander::expand(r, target),
                locations: self.resolver.resolve(&r.location_spec),
            })
            .filter(|d| !d.dates.is_empty())
            .collect();

        let mut report = PlanReport {
            target,
            date_context: format!(
                "{} {}",
                MONTH_LABELS[(target.month as usize).saturating_sub(1) % 12],
                target.year
            ),
            splits_required: Vec::new(),
            no_conflict: Vec::new(),
        };

        for sub in records.iter().filter(|r| r.tier() == DealTier::Subordinate) {
            match self.analyze_subordinate(sub, &dominants, target) {
                Ok(split) => report.splits_required.push(split),
                Err(entry) => report.no_conflict.push(entry),
            }
        }

        info!(
            splits = report.splits_required.len(),
            no_conflict = report.no_conflict.len(),
            "拆分规划完成"
        );
        Ok(report)
    }

    fn analyze_subordinate(
        &self,
        sub: &SpecRecord,
        dominants: &[DominantEntry],
        target: TargetMonth,
    ) -> Result<SplitRequirement, NoConflictEntry> {
        let sub_dates = DateExpander::expand(sub, target);
        let no_conflict = |reason: &str| NoConflictEntry {
            brand: sub.brand.clone(),
            origin: sub.origin.clone(),
            subordinate_dates: sub_dates.iter().copied().collect(),
            reason: reason.to_string(),
        };

        if sub_dates.is_empty() {
            return Err(no_conflict("周几无法识别, 目标月内无促销日期"));
        }

        let sub_brands = brand_keys(&sub.brand);
        let sub_locations = self.resolver.resolve(&sub.location_spec);

        let mut conflict_dates = Vec::new();
        let mut dominant_union = LocationSet::empty();
        let mut hits: BTreeMap<usize, Vec<NaiveDate>> = BTreeMap::new();
        let mut same_brand_seen = false;

        for date in &sub_dates {
            let claiming: Vec<(usize, &DominantEntry)> = dominants
                .iter()
                .enumerate()
                .filter(|(_, d)| d.dates.contains(date) && !d.brands.is_disjoint(&sub_brands))
                .collect();
            if claiming.is_empty() {
                continue;
            }
            same_brand_seen = true;

            let day_union = claiming
                .iter()
                .fold(LocationSet::empty(), |acc, (_, d)| acc.union(&d.locations));
            if classify_conflict(&sub_locations, &day_union).kind == ConflictKind::None {
                continue;
            }

            conflict_dates.push(*date);
            dominant_union = dominant_union.union(&day_union);
            for (idx, d) in claiming {
                if !sub_locations.is_disjoint(&d.locations) {
                    hits.entry(idx).or_default().push(*date);
                }
            }
        }

        if conflict_dates.is_empty() {
            return Err(no_conflict(if same_brand_seen {
                "同品牌上级促销门店无交集"
            } else {
                "目标月内无同品牌上级促销"
            }));
        }

        let conflict = classify_conflict(&sub_locations, &dominant_union);
        let Some(plan) = Self::plan_for(&sub.brand, &sub_dates, &conflict_dates, &conflict) else {
            return Err(no_conflict("冲突门店无交集"));
        };

        let interrupting = hits
            .into_iter()
            .map(|(idx, dates)| {
                let d = &dominants[idx];
                InterruptingDeal {
                    brand: d.record.brand.clone(),
                    frequency_class: d.record.frequency_class,
                    locations: d.locations.clone(),
                    dates,
                    origin: d.record.origin.clone(),
                    external_id_cell: d.record.external_id_cell.clone(),
                }
            })
            .collect();

        debug!(
            brand = %sub.brand,
            kind = %conflict.kind,
            conflict_dates = conflict_dates.len(),
            steps = plan.steps().len(),
            "生成拆分方案"
        );

        Ok(SplitRequirement {
            subordinate: sub.clone(),
            subordinate_locations: sub_locations,
            subordinate_dates: sub_dates.into_iter().collect(),
            conflict_dates,
            conflict,
            interrupting,
            plan,
        })
    }

    /// 由下级促销日期、冲突日期、门店冲突生成拆分方案
    ///
    /// # 规则
    /// - PART1: 首个促销日 ~ 首个冲突日前一天
    /// - GAP (FULL) / PATCH (PARTIAL, 仅剩余门店): 首个冲突日 ~ 最后冲突日
    /// - PART2: 最后冲突日后一天 ~ 最后促销日
    /// - 冲突类型为 NONE 或无冲突日期 → None
    pub fn plan_for(
        brand: &str,
        subordinate_dates: &BTreeSet<NaiveDate>,
        conflict_dates: &[NaiveDate],
        conflict: &LocationConflict,
    ) -> Option<ConflictPlan> {
        if conflict.kind == ConflictKind::None {
            return None;
        }
        let first_sub = *subordinate_dates.first()?;
        let last_sub = *subordinate_dates.last()?;
        let first_conflict = *conflict_dates.iter().min()?;
        let last_conflict = *conflict_dates.iter().max()?;

        let dates_label = conflict_dates
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut steps = Vec::with_capacity(3);

        if let Some(range) = DateRange::new(first_sub, first_conflict - Duration::days(1)) {
            steps.push(ConflictPlanStep::CreatePart1 {
                range,
                rationale: format!("{} 周循环在首个冲突日 {} 之前正常执行", brand, first_conflict),
            });
        }

        let span = DateRange::new(first_conflict, last_conflict)?;
        match conflict.kind {
            ConflictKind::Full => steps.push(ConflictPlanStep::Gap {
                range: span,
                rationale: format!(
                    "上级促销覆盖全部门店 {} , 冲突日 [{}] 暂停周循环",
                    conflict.conflicting, dates_label
                ),
            }),
            ConflictKind::Partial => steps.push(ConflictPlanStep::Patch {
                range: span,
                locations: conflict.surviving.clone(),
                rationale: format!(
                    "冲突日 [{}] 让出 {}, 仅保留 {}",
                    dates_label, conflict.conflicting, conflict.surviving
                ),
            }),
            ConflictKind::None => return None,
        }

        if let Some(range) = DateRange::new(last_conflict + Duration::days(1), last_sub) {
            steps.push(ConflictPlanStep::CreatePart2 {
                range,
                rationale: format!("{} 周循环在最后冲突日 {} 之后恢复", brand, last_conflict),
            });
        }

        Some(ConflictPlan::new(brand, steps))
    }
}

fn brand_keys(brand: &str) -> BTreeSet<String> {
    let mut keys: BTreeSet<String> = parse_multi_brand(brand)
        .into_iter()
        .map(|b| b.to_lowercase())
        .collect();
    if keys.is_empty() {
        keys.insert(brand.trim().to_lowercase());
    }
    keys
}
