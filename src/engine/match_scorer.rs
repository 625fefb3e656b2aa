// ==========================================
// 促销日历对账系统 - 匹配打分器
// ==========================================
// 职责: 计划表记录 ↔ 外部系统记录 的 0-100 置信度打分与选取
// 红线: 相同输入必须得到相同排序（分数 → 结束日期 → ID 三级排序）
// 红线: 已有标签化 ID 的行直接按标签确认, 不重新打分
// ==========================================

use crate::config::{OverrideTables, ScoringConfig};
use crate::domain::deal::{ExternalRecord, ExternalSnapshot, RowOrigin, SpecRecord, TargetMonth};
use crate::domain::tagged_id::TaggedId;
use crate::domain::types::{FrequencyClass, MatchStatus};
use crate::engine::brand::{pair_ids_to_brands, parse_multi_brand};
use crate::engine::date_expander::DateExpander;
use crate::engine::error::EngineResult;
use crate::engine::similarity::token_set_ratio;
use crate::engine::tagged_id::TaggedIdCodec;
use crate::engine::validation::parse_numeric;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

// ==========================================
// 打分明细
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrandMatchKind {
    Exact,    // 品牌完全一致
    Override, // 覆写表命中
    Fuzzy,    // 词集合相似度
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub brand_similarity: u8,
    pub brand_match: BrandMatchKind,
    pub linked_brand_match: bool,
    pub brand_points: f64,    // 0-50
    pub discount_points: f64, // 0-30
    pub vendor_points: f64,   // 0-15
    pub category_points: f64, // 0-5
    pub temporal_points: i32, // -5..+10
    pub total: u8,            // 0-100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub external_id: u64,
    pub external_brand: String,
    pub end_date: Option<NaiveDate>,
    pub score: u8,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    ConfirmedByTag,   // 单元格已有 ID
    AutoSelected,     // >= 自动选中阈值
    Suggested,        // 建议区间, 需人工确认
    NoConfidentMatch, // 低于建议阈值
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub brand: String,
    pub frequency_class: FrequencyClass,
    pub origin: RowOrigin,
    pub status: MatchStatus,
    pub resolution: Resolution,
    pub selected_id: Option<u64>,
    pub confirmed_ids: Vec<TaggedId>,
    pub suggestions: Vec<MatchCandidate>,
}

// ==========================================
// MatchScorer - 匹配打分器
// ==========================================
pub struct MatchScorer<'a> {
    config: &'a ScoringConfig,
    tables: &'a OverrideTables,
    target: Option<TargetMonth>,
}

impl<'a> MatchScorer<'a> {
    pub fn new(config: &'a ScoringConfig, tables: &'a OverrideTables) -> Self {
        Self {
            config,
            tables,
            target: None,
        }
    }

    /// 设置目标月份（启用时间加减分）
    pub fn with_target(mut self, target: TargetMonth) -> Self {
        self.target = Some(target);
        self
    }

    /// 整条记录打分（品牌取整格文本）
    pub fn score(&self, spec: &SpecRecord, candidate: &ExternalRecord) -> u8 {
        self.score_for_brand(spec.brand.trim(), spec, candidate).total
    }

    /// 指定品牌（多品牌行中的一个）对候选记录打分
    ///
    /// # 规则
    /// - 品牌: 相似度 × 0.50, 关联品牌命中 +5, 上限 50
    /// - 品牌相似度 >= value_gate 时:
    ///   - 折扣: 完全一致 30, 相差 <= 5 为 15
    ///   - 供应商承担: 完全一致 15, 相差 <= 5 为 10
    /// - 品类: 相同或包含 5, 有交集 3, 双方均空 5
    /// - 时间: 结束月 = 目标月 +10, 下月 +5, 更晚 +3, 已过期 -5, 无法解析 0
    pub fn score_for_brand(
        &self,
        brand: &str,
        spec: &SpecRecord,
        candidate: &ExternalRecord,
    ) -> ScoreBreakdown {
        let (similarity, kind, linked) = self.brand_similarity(brand, candidate);

        let mut brand_points = similarity as f64 * self.config.brand_weight;
        if linked {
            brand_points += self.config.linked_brand_bonus;
        }
        let brand_points = brand_points.min(100.0 * self.config.brand_weight);

        let (discount_points, vendor_points) = if similarity >= self.config.value_gate {
            (
                value_points(&spec.discount, &candidate.discount, 30.0, 15.0),
                value_points(
                    &spec.vendor_contribution,
                    &candidate.vendor_contribution,
                    15.0,
                    10.0,
                ),
            )
        } else {
            (0.0, 0.0)
        };

        let category_points = category_points(&spec.category_spec, &candidate.categories);
        let temporal_points = self.temporal_points(candidate.end_date);

        let sum = brand_points + discount_points + vendor_points + category_points
            + temporal_points as f64;
        let total = sum.round().clamp(0.0, 100.0) as u8;

        ScoreBreakdown {
            brand_similarity: similarity,
            brand_match: kind,
            linked_brand_match: linked,
            brand_points,
            discount_points,
            vendor_points,
            category_points,
            temporal_points,
            total,
        }
    }

    /// 品牌相似度
    ///
    /// # 返回
    /// (相似度 0-100, 命中方式, 覆写目标是否命中候选的关联品牌)
    pub fn brand_similarity(&self, brand: &str, candidate: &ExternalRecord) -> (u8, BrandMatchKind, bool) {
        let threshold = self.config.linked_brand_threshold;
        let override_target = self
            .tables
            .brand_override(brand)
            .filter(|t| !t.eq_ignore_ascii_case(brand.trim()));

        let linked = match override_target {
            Some(target) if !candidate.linked_brand.trim().is_empty() => {
                token_set_ratio(target, &candidate.linked_brand) >= threshold
            }
            _ => false,
        };

        if brand.trim().eq_ignore_ascii_case(candidate.brand.trim()) {
            return (100, BrandMatchKind::Exact, linked);
        }

        if let Some(target) = override_target {
            if target.eq_ignore_ascii_case(candidate.brand.trim())
                || token_set_ratio(target, &candidate.brand) >= threshold
            {
                return (100, BrandMatchKind::Override, linked);
            }
        }

        (
            token_set_ratio(brand, &candidate.brand),
            BrandMatchKind::Fuzzy,
            linked,
        )
    }

    fn temporal_points(&self, end_date: Option<NaiveDate>) -> i32 {
        let (Some(target), Some(end)) = (self.target, end_date) else {
            return 0;
        };
        let end_ordinal = end.year() as i64 * 12 + end.month() as i64;
        match end_ordinal - target.ordinal() {
            0 => 10,
            1 => 5,
            d if d > 1 => 3,
            _ => -5,
        }
    }

    /// 对一条计划表记录（可能多品牌）给出匹配结果
    ///
    /// # 规则
    /// - 单元格有标签化 ID → 按标签确认（多品牌时先做 品牌↔ID 配对）
    /// - 否则对快照打分: >= auto 自动选中; >= suggest 给出前 N 个候选; 否则无可信匹配
    /// - 周循环记录只考虑周几有交集的候选
    pub fn match_record(
        &self,
        spec: &SpecRecord,
        snapshot: &ExternalSnapshot,
    ) -> EngineResult<Vec<MatchOutcome>> {
        spec.ensure_identity()?;

        let mut brands = parse_multi_brand(&spec.brand);
        if brands.is_empty() {
            brands.push(spec.brand.trim().to_string());
        }

        let cell = TaggedIdCodec::parse(&spec.external_id_cell);
        let mut outcomes = Vec::with_capacity(brands.len());

        let confirmed: Vec<(String, Vec<TaggedId>)> = if cell.is_empty() {
            Vec::new()
        } else if brands.len() == 1 {
            vec![(brands[0].clone(), cell.entries().to_vec())]
        } else {
            let pairing = pair_ids_to_brands(
                &cell,
                &brands,
                snapshot,
                self.tables,
                self.config.pairing_threshold,
            );
            if !pairing.unmatched.is_empty() {
                debug!(
                    brand = %spec.brand,
                    unmatched = pairing.unmatched.len(),
                    "部分 ID 无法配对到品牌"
                );
            }
            brands
                .iter()
                .map(|b| {
                    let ids: Vec<TaggedId> = pairing.ids_for(b).into_iter().cloned().collect();
                    (b.clone(), ids)
                })
                .filter(|(_, ids)| !ids.is_empty())
                .collect()
        };

        for brand in &brands {
            if let Some((_, ids)) = confirmed.iter().find(|(b, _)| b == brand) {
                outcomes.push(MatchOutcome {
                    brand: brand.clone(),
                    frequency_class: spec.frequency_class,
                    origin: spec.origin.clone(),
                    status: MatchStatus::High,
                    resolution: Resolution::ConfirmedByTag,
                    selected_id: ids.first().and_then(|t| t.id.parse().ok()),
                    confirmed_ids: ids.clone(),
                    suggestions: Vec::new(),
                });
                continue;
            }
            outcomes.push(self.score_brand(brand, spec, snapshot));
        }

        Ok(outcomes)
    }

    fn score_brand(
        &self,
        brand: &str,
        spec: &SpecRecord,
        snapshot: &ExternalSnapshot,
    ) -> MatchOutcome {
        let spec_weekdays = if spec.frequency_class == FrequencyClass::RecurringWeekly {
            DateExpander::parse_weekdays(&spec.recurrence)
        } else {
            Default::default()
        };

        let mut candidates: Vec<MatchCandidate> = snapshot
            .records()
            .iter()
            .filter(|r| {
                if spec_weekdays.is_empty() {
                    return true;
                }
                let text = r.weekday.trim().to_lowercase();
                if matches!(text.as_str(), "" | "all" | "all days" | "daily" | "everyday") {
                    return true;
                }
                !DateExpander::parse_weekdays(&text).is_disjoint(&spec_weekdays)
            })
            .filter_map(|r| {
                let breakdown = self.score_for_brand(brand, spec, r);
                if breakdown.brand_similarity < self.config.candidate_floor {
                    return None;
                }
                Some(MatchCandidate {
                    external_id: r.id,
                    external_brand: r.brand.clone(),
                    end_date: r.end_date,
                    score: breakdown.total,
                    breakdown,
                })
            })
            .collect();

        candidates.sort_by(compare_candidates);

        let top_score = candidates.first().map(|c| c.score).unwrap_or(0);
        let (status, resolution) = if top_score >= self.config.auto_select_threshold {
            (MatchStatus::High, Resolution::AutoSelected)
        } else if top_score >= self.config.suggest_threshold {
            (MatchStatus::Medium, Resolution::Suggested)
        } else {
            (MatchStatus::Low, Resolution::NoConfidentMatch)
        };

        let selected_id = match resolution {
            Resolution::AutoSelected => candidates.first().map(|c| c.external_id),
            _ => None,
        };

        let suggestions = match resolution {
            Resolution::NoConfidentMatch => Vec::new(),
            _ => candidates
                .into_iter()
                .take(self.config.suggestion_limit)
                .collect(),
        };

        debug!(
            brand = brand,
            top_score = top_score,
            status = %status,
            "品牌匹配完成"
        );

        MatchOutcome {
            brand: brand.to_string(),
            frequency_class: spec.frequency_class,
            origin: spec.origin.clone(),
            status,
            resolution,
            selected_id,
            confirmed_ids: Vec::new(),
            suggestions,
        }
    }

    /// 批量匹配
    #[instrument(skip(self, specs, snapshot), fields(specs = specs.len(), externals = snapshot.len()))]
    pub fn match_all(
        &self,
        specs: &[SpecRecord],
        snapshot: &ExternalSnapshot,
    ) -> EngineResult<Vec<MatchOutcome>> {
        let mut outcomes = Vec::new();
        for spec in specs {
            outcomes.extend(self.match_record(spec, snapshot)?);
        }

        let high = outcomes.iter().filter(|o| o.status == MatchStatus::High).count();
        let medium = outcomes.iter().filter(|o| o.status == MatchStatus::Medium).count();
        info!(
            total = outcomes.len(),
            high = high,
            medium = medium,
            low = outcomes.len() - high - medium,
            "匹配完成"
        );
        Ok(outcomes)
    }
}

/// 排序: 分数降序 → 结束日期降序（长期有效视为最晚）→ ID 升序
fn compare_candidates(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| {
            let a_end = a.end_date.unwrap_or(NaiveDate::MAX);
            let b_end = b.end_date.unwrap_or(NaiveDate::MAX);
            b_end.cmp(&a_end)
        })
        .then_with(|| a.external_id.cmp(&b.external_id))
}

/// 数值字段打分: 完全一致 exact, 相差 <= 5 为 near, 否则 0; 任一侧无法解析 0
fn value_points(spec: &str, candidate: &str, exact: f64, near: f64) -> f64 {
    match (parse_numeric(spec), parse_numeric(candidate)) {
        (Some(a), Some(b)) if (a - b).abs() < 0.01 => exact,
        (Some(a), Some(b)) if (a - b).abs() <= 5.0 => near,
        _ => 0.0,
    }
}

fn category_set(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty() && !matches!(c.as_str(), "nan" | "none" | "-" | "n/a"))
        .collect()
}

fn category_points(spec: &str, candidate: &str) -> f64 {
    let a = category_set(spec);
    let b = category_set(candidate);
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 5.0,
        (true, false) | (false, true) => 0.0,
        _ if a.is_subset(&b) || b.is_subset(&a) => 5.0,
        _ if !a.is_disjoint(&b) => 3.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SpecRecord {
        SpecRecord::new("Kiva", FrequencyClass::RecurringWeekly, "Monday", 2)
            .with_discount("20%")
            .with_vendor_contribution("50%")
            .with_categories("Edibles")
    }

    fn external(id: u64, brand: &str) -> ExternalRecord {
        let mut r = ExternalRecord::new(id, brand);
        r.weekday = "Monday".to_string();
        r.discount = "20".to_string();
        r.vendor_contribution = "50".to_string();
        r.categories = "Edibles".to_string();
        r
    }

    #[test]
    fn test_self_score_is_100() {
        let config = ScoringConfig::default();
        let tables = OverrideTables::default();
        let scorer = MatchScorer::new(&config, &tables);
        assert_eq!(scorer.score(&spec(), &external(1, "Kiva")), 100);
    }

    #[test]
    fn test_value_gate_blocks_value_points() {
        let config = ScoringConfig::default();
        let tables = OverrideTables::default();
        let scorer = MatchScorer::new(&config, &tables);
        let breakdown = scorer.score_for_brand("Kiva", &spec(), &external(1, "Camino"));
        assert!(breakdown.brand_similarity < config.value_gate);
        assert_eq!(breakdown.discount_points, 0.0);
        assert_eq!(breakdown.vendor_points, 0.0);
    }

    #[test]
    fn test_near_values() {
        assert_eq!(value_points("20%", "23%", 30.0, 15.0), 15.0);
        assert_eq!(value_points("20%", "30%", 30.0, 15.0), 0.0);
        assert_eq!(value_points("50%", "50", 15.0, 10.0), 15.0);
        assert_eq!(value_points("", "50", 15.0, 10.0), 0.0);
    }

    #[test]
    fn test_category_points() {
        assert_eq!(category_points("", ""), 5.0);
        assert_eq!(category_points("Edibles", "edibles, Flower"), 5.0);
        assert_eq!(category_points("Edibles, Vapes", "Edibles, Flower"), 3.0);
        assert_eq!(category_points("Vapes", "Flower"), 0.0);
        assert_eq!(category_points("Vapes", ""), 0.0);
    }

    #[test]
    fn test_temporal_points() {
        let config = ScoringConfig::default();
        let tables = OverrideTables::default();
        let scorer =
            MatchScorer::new(&config, &tables).with_target(TargetMonth::new(3, 2025).unwrap());
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        assert_eq!(scorer.temporal_points(d(2025, 3, 31)), 10);
        assert_eq!(scorer.temporal_points(d(2025, 4, 30)), 5);
        assert_eq!(scorer.temporal_points(d(2025, 12, 31)), 3);
        assert_eq!(scorer.temporal_points(d(2025, 2, 28)), -5);
        assert_eq!(scorer.temporal_points(None), 0);
    }

    #[test]
    fn test_override_wins_and_linked_bonus() {
        let config = ScoringConfig::default();
        let mut tables = OverrideTables::default();
        tables
            .brand_overrides
            .insert("KVA".to_string(), "Kiva Confections".to_string());
        let scorer = MatchScorer::new(&config, &tables);

        let mut candidate = external(1, "Kiva Confections");
        candidate.linked_brand = "Kiva Confections".to_string();
        let (sim, kind, linked) = scorer.brand_similarity("KVA", &candidate);
        assert_eq!(sim, 100);
        assert_eq!(kind, BrandMatchKind::Override);
        assert!(linked);

        // 覆写目标只命中关联品牌: 相似度不变, 但获得加分
        let mut other = external(2, "Camino");
        other.linked_brand = "Kiva Confections".to_string();
        let plain = scorer.score_for_brand("KVA", &spec(), &external(3, "Camino"));
        let with_link = scorer.score_for_brand("KVA", &spec(), &other);
        assert_eq!(
            with_link.brand_points - plain.brand_points,
            config.linked_brand_bonus
        );
    }

    #[test]
    fn test_tie_break_prefers_latest_end_then_lowest_id() {
        let mut a = MatchCandidate {
            external_id: 9,
            external_brand: "Kiva".to_string(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 31),
            score: 90,
            breakdown: ScoreBreakdown {
                brand_similarity: 100,
                brand_match: BrandMatchKind::Exact,
                linked_brand_match: false,
                brand_points: 50.0,
                discount_points: 30.0,
                vendor_points: 10.0,
                category_points: 0.0,
                temporal_points: 0,
                total: 90,
            },
        };
        let mut b = a.clone();
        b.external_id = 3;
        b.end_date = NaiveDate::from_ymd_opt(2025, 4, 30);
        let mut candidates = vec![a.clone(), b.clone()];
        candidates.sort_by(compare_candidates);
        assert_eq!(candidates[0].external_id, 3);

        a.end_date = b.end_date;
        let mut candidates = vec![a, b];
        candidates.sort_by(compare_candidates);
        assert_eq!(candidates[0].external_id, 3);
    }
}
