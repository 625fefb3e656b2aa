// ==========================================
// 促销日历对账系统 - 拆分结果核验
// ==========================================
// 职责: 外部系统录入拆分后, 用新快照复核
//   1. 缺口核验: 冲突日是否仍有下级促销在冲突门店生效
//   2. 最终覆盖: 冲突日每家冲突门店是否恰好一条记录生效
//   3. 录入核验: 单个步骤的录入结果（品牌 + 开始日期 + 结束日期）
// 红线: 核验只读快照, 不修改方案
// ==========================================

use crate::config::{OverrideTables, VerifierConfig};
use crate::domain::deal::{ExternalRecord, ExternalSnapshot};
use crate::domain::location::LocationSet;
use crate::domain::plan::{ConflictPlanStep, PlanAction};
use crate::domain::tagged_id::SlotTag;
use crate::domain::validation::ValidationRecord;
use crate::engine::brand::{parse_multi_brand, resolve_brand_for_match};
use crate::engine::conflict_planner::{PlanReport, SplitRequirement};
use crate::engine::date_expander::DateExpander;
use crate::engine::location_resolver::LocationResolver;
use crate::engine::similarity::token_set_ratio;
use crate::engine::tagged_id::TaggedIdCodec;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 缺口核验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingGap {
    pub brand: String,
    pub weekday: String,
    pub external_id: u64,
    pub external_end_date: Option<NaiveDate>,
    pub expected_gap_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedGap {
    pub brand: String,
    pub gap_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapClosureReport {
    pub missing_gaps: Vec<MissingGap>,   // 冲突日仍生效（需处理）
    pub verified_gaps: Vec<VerifiedGap>, // 已正确让出
}

// ==========================================
// 最终覆盖结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageFinding {
    pub brand: String,
    pub date: NaiveDate,
    pub governing_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalCoverageReport {
    pub double_dips: Vec<CoverageFinding>, // 同日多条记录生效
    pub empty_gaps: Vec<CoverageFinding>,  // 同日无记录生效
    pub clean: Vec<CoverageFinding>,
}

// ==========================================
// 录入载荷 / 录入核验
// ==========================================

/// 单个拆分步骤的录入载荷, 交给外部录入方, 也作为字段校验的目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPayload {
    pub action: PlanAction,
    pub brand: String,
    pub weekday: String,
    pub discount: String,
    pub vendor_contribution: String,
    pub locations: LocationSet,
    pub categories: String,
    pub rebate_type: String,
    pub deal_info: String,
    pub notes: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub source_row: usize,
    pub existing_id: Option<String>, // PATCH 复用的原 ID
    pub id_slot: SlotTag,            // 录入后 ID 写回的槽位
}

impl EntryPayload {
    pub fn to_validation_record(&self) -> ValidationRecord {
        ValidationRecord {
            discount: self.discount.clone(),
            vendor_contribution: self.vendor_contribution.clone(),
            brand: self.brand.clone(),
            locations: self.locations.names(),
            start_date: self.start_date.to_string(),
            end_date: self.end_date.to_string(),
            active_days: split_list(&self.weekday),
            categories: split_list(&self.categories),
            rebate_type: self.rebate_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalEntryStatus {
    Verified,
    Discrepancy,
    NoSnapshot,
    BrandNotFound,
    StartDateNotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalEntryCheck {
    pub status: FinalEntryStatus,
    pub issues: Vec<String>,
    pub external_id: Option<u64>,
    pub external_brand: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FinalEntryCheck {
    fn failed(status: FinalEntryStatus, issue: String) -> Self {
        Self {
            status,
            issues: vec![issue],
            external_id: None,
            external_brand: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == FinalEntryStatus::Verified
    }
}

// ==========================================
// GapVerifier - 拆分核验器
// ==========================================
pub struct GapVerifier<'a> {
    brand_threshold: u8,
    tables: Option<&'a OverrideTables>,
    resolver: LocationResolver<'a>,
}

impl GapVerifier<'static> {
    pub fn builtin(config: &VerifierConfig) -> Self {
        Self {
            brand_threshold: config.brand_match_threshold,
            tables: None,
            resolver: LocationResolver::builtin(),
        }
    }
}

impl<'a> GapVerifier<'a> {
    pub fn new(config: &VerifierConfig, tables: &'a OverrideTables) -> Self {
        Self {
            brand_threshold: config.brand_match_threshold,
            tables: Some(tables),
            resolver: LocationResolver::new(tables),
        }
    }

    /// 缺口核验
    ///
    /// # 规则
    /// - 只看品牌相似度 ≥ 阈值的外部记录, 排除打断方（上级促销）自身的 ID
    /// - 冲突日: 记录在有效期内、周几生效、门店与冲突门店有交集 → missing gap
    /// - 否则 → verified gap
    /// - 快照中没有该品牌记录时跳过该拆分需求
    #[instrument(skip(self, report, snapshot), fields(splits = report.splits_required.len(), externals = snapshot.len()))]
    pub fn verify_gap_closure(
        &self,
        report: &PlanReport,
        snapshot: &ExternalSnapshot,
    ) -> GapClosureReport {
        let mut result = GapClosureReport::default();
        if snapshot.is_empty() {
            warn!("外部快照为空, 跳过缺口核验");
            return result;
        }

        for req in &report.splits_required {
            let dominant_ids = interrupting_ids(req);
            let relevant: Vec<&ExternalRecord> = snapshot
                .records()
                .iter()
                .filter(|r| !dominant_ids.contains(&r.id))
                .filter(|r| self.brand_matches(&req.subordinate.brand, &r.brand))
                .collect();
            if relevant.is_empty() {
                debug!(brand = %req.subordinate.brand, "快照中无该品牌记录");
                continue;
            }

            for date in &req.conflict_dates {
                let still_active = relevant
                    .iter()
                    .find(|r| self.governs(r, *date, &req.conflict.conflicting));

                match still_active {
                    Some(record) => result.missing_gaps.push(MissingGap {
                        brand: req.subordinate.brand.clone(),
                        weekday: req.subordinate.recurrence.clone(),
                        external_id: record.id,
                        external_end_date: record.end_date,
                        expected_gap_date: *date,
                    }),
                    None => result.verified_gaps.push(VerifiedGap {
                        brand: req.subordinate.brand.clone(),
                        gap_date: *date,
                    }),
                }
            }
        }

        info!(
            missing = result.missing_gaps.len(),
            verified = result.verified_gaps.len(),
            "缺口核验完成"
        );
        result
    }

    /// 最终覆盖核验: 每个冲突日在冲突门店上生效的同品牌记录数（含上级促销）
    ///
    /// # 返回
    /// - >1 → double_dips
    /// - 0 → empty_gaps
    /// - 1 → clean
    #[instrument(skip(self, report, snapshot), fields(splits = report.splits_required.len()))]
    pub fn verify_final_coverage(
        &self,
        report: &PlanReport,
        snapshot: &ExternalSnapshot,
    ) -> FinalCoverageReport {
        let mut result = FinalCoverageReport::default();

        for req in &report.splits_required {
            for date in &req.conflict_dates {
                let governing_ids: Vec<u64> = snapshot
                    .records()
                    .iter()
                    .filter(|r| self.brand_matches(&req.subordinate.brand, &r.brand))
                    .filter(|r| self.governs(r, *date, &req.conflict.conflicting))
                    .map(|r| r.id)
                    .collect();

                let finding = CoverageFinding {
                    brand: req.subordinate.brand.clone(),
                    date: *date,
                    governing_ids,
                };
                match finding.governing_ids.len() {
                    0 => result.empty_gaps.push(finding),
                    1 => result.clean.push(finding),
                    _ => result.double_dips.push(finding),
                }
            }
        }

        info!(
            double_dips = result.double_dips.len(),
            empty_gaps = result.empty_gaps.len(),
            clean = result.clean.len(),
            "最终覆盖核验完成"
        );
        result
    }

    /// 录入核验: 品牌模糊匹配 + 开始日期精确匹配, 报告结束日期差异
    pub fn verify_final_entry(
        &self,
        payload: &EntryPayload,
        snapshot: &ExternalSnapshot,
    ) -> FinalEntryCheck {
        if snapshot.is_empty() {
            return FinalEntryCheck::failed(
                FinalEntryStatus::NoSnapshot,
                "未提供外部系统快照".to_string(),
            );
        }

        let brand_matched: Vec<&ExternalRecord> = snapshot
            .records()
            .iter()
            .filter(|r| self.brand_matches(&payload.brand, &r.brand))
            .collect();
        if brand_matched.is_empty() {
            return FinalEntryCheck::failed(
                FinalEntryStatus::BrandNotFound,
                format!("外部系统中找不到品牌 '{}'", payload.brand),
            );
        }

        let Some(entry) = brand_matched
            .into_iter()
            .find(|r| r.start_date == Some(payload.start_date))
        else {
            return FinalEntryCheck::failed(
                FinalEntryStatus::StartDateNotFound,
                format!("找不到 {} 开始于 {} 的记录", payload.brand, payload.start_date),
            );
        };

        let mut issues = Vec::new();
        if let Some(actual_end) = entry.end_date {
            if actual_end != payload.end_date {
                issues.push(format!(
                    "结束日期: 期望 {}, 实际 {}",
                    payload.end_date, actual_end
                ));
            }
        }

        FinalEntryCheck {
            status: if issues.is_empty() {
                FinalEntryStatus::Verified
            } else {
                FinalEntryStatus::Discrepancy
            },
            issues,
            external_id: Some(entry.id),
            external_brand: Some(entry.brand.clone()),
            start_date: entry.start_date,
            end_date: entry.end_date,
        }
    }

    /// 外部品牌与计划表品牌（任一成员, 含覆写）相似度 ≥ 阈值
    fn brand_matches(&self, spec_brand: &str, external_brand: &str) -> bool {
        let external = external_brand.trim().to_lowercase();
        if external.is_empty() {
            return false;
        }
        let mut brands = parse_multi_brand(spec_brand);
        if brands.is_empty() {
            brands.push(spec_brand.trim().to_string());
        }
        brands.iter().any(|brand| {
            let resolved = match self.tables {
                Some(tables) => resolve_brand_for_match(brand, tables),
                None => brand.trim().to_string(),
            };
            token_set_ratio(&resolved.to_lowercase(), &external) >= self.brand_threshold
                || token_set_ratio(&brand.to_lowercase(), &external) >= self.brand_threshold
        })
    }

    fn governs(&self, record: &ExternalRecord, date: NaiveDate, conflicting: &LocationSet) -> bool {
        record.covers(date)
            && DateExpander::is_weekday_active(date, &record.weekday)
            && !self.resolver.resolve(&record.locations).is_disjoint(conflicting)
    }
}

/// 拆分步骤 → 录入载荷
///
/// # 规则
/// - PATCH 使用步骤自带的剩余门店, 其余步骤使用下级促销门店
/// - PATCH 复用原 ID（W1 优先, 否则首个 ID）
/// - ID 槽位: PART1 → W1, PATCH/GAP → WP, PART2 → W2
pub fn build_entry_payload(requirement: &SplitRequirement, step: &ConflictPlanStep) -> EntryPayload {
    let sub = &requirement.subordinate;
    let range = step.range();
    let action = step.action();

    let existing_id = match action {
        PlanAction::Patch => {
            let cell = TaggedIdCodec::parse(&sub.external_id_cell);
            cell.get(SlotTag::weekly(1))
                .or_else(|| cell.first_id())
                .map(|id| id.to_string())
        }
        _ => None,
    };

    EntryPayload {
        action,
        brand: sub.brand.clone(),
        weekday: sub.recurrence.clone(),
        discount: sub.discount.clone(),
        vendor_contribution: sub.vendor_contribution.clone(),
        locations: step
            .locations()
            .cloned()
            .unwrap_or_else(|| requirement.subordinate_locations.clone()),
        categories: sub.category_spec.clone(),
        rebate_type: sub.rebate_type.clone(),
        deal_info: sub.deal_info.clone(),
        notes: sub.notes.clone(),
        start_date: range.start(),
        end_date: range.end(),
        source_row: sub.origin.first_row(),
        existing_id,
        id_slot: slot_for(action),
    }
}

/// 步骤动作对应的 ID 槽位
pub fn slot_for(action: PlanAction) -> SlotTag {
    match action {
        PlanAction::CreatePart1 => SlotTag::weekly(1),
        PlanAction::CreatePart2 => SlotTag::weekly(2),
        PlanAction::Patch | PlanAction::Gap => SlotTag::weekly_patch(),
    }
}

fn interrupting_ids(requirement: &SplitRequirement) -> HashSet<u64> {
    requirement
        .interrupting
        .iter()
        .flat_map(|deal| TaggedIdCodec::parse(&deal.external_id_cell).entries().to_vec())
        .filter_map(|entry| entry.id.parse::<u64>().ok())
        .collect()
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
