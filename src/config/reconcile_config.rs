// ==========================================
// 促销日历对账系统 - 对账参数
// ==========================================
// 职责: 匹配打分、缺口核验、字段校验、步骤执行的可调参数
// 红线: 所有阈值集中在此, 引擎不得硬编码
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

// ==========================================
// ScoringConfig - 匹配打分参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub brand_weight: f64,          // 品牌相似度权重: 0.50 (满分 50)
    pub value_gate: u8,             // 品牌相似度 >= 75 才计入折扣/供应商分
    pub auto_select_threshold: u8,  // >= 95 自动选中
    pub suggest_threshold: u8,      // 70-94 给出候选
    pub suggestion_limit: usize,    // 候选数量上限: 5
    pub linked_brand_bonus: f64,    // 关联品牌加分: 5
    pub linked_brand_threshold: u8, // 覆写目标与关联品牌相似度阈值: 90
    pub candidate_floor: u8,        // 品牌相似度 < 60 的候选直接忽略
    pub pairing_threshold: u8,      // 多品牌 ID 配对模糊阈值: 95
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            brand_weight: 0.50,
            value_gate: 75,
            auto_select_threshold: 95,
            suggest_threshold: 70,
            suggestion_limit: 5,
            linked_brand_bonus: 5.0,
            linked_brand_threshold: 90,
            candidate_floor: 60,
            pairing_threshold: 95,
        }
    }
}

// ==========================================
// VerifierConfig - 缺口核验参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub brand_match_threshold: u8, // 外部记录品牌相似度阈值: 85
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            brand_match_threshold: 85,
        }
    }
}

// ==========================================
// ValidationConfig - 字段校验参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub numeric_tolerance: f64, // 数值比较容差: 0.5
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            numeric_tolerance: 0.5,
        }
    }
}

// ==========================================
// ExecutorConfig - 步骤执行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub step_timeout_secs: u64, // 单步执行超时: 120秒
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 120,
        }
    }
}

// ==========================================
// ReconcileConfig - 总配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub scoring: ScoringConfig,
    pub verifier: VerifierConfig,
    pub validation: ValidationConfig,
    pub executor: ExecutorConfig,
}

impl ReconcileConfig {
    /// 校验阈值之间的约束
    ///
    /// # 规则
    /// - 所有百分制阈值 <= 100
    /// - suggest_threshold <= auto_select_threshold
    /// - brand_weight 在 (0, 1]
    /// - numeric_tolerance >= 0
    pub fn validate(&self) -> EngineResult<()> {
        let s = &self.scoring;
        for (name, value) in [
            ("scoring.value_gate", s.value_gate),
            ("scoring.auto_select_threshold", s.auto_select_threshold),
            ("scoring.suggest_threshold", s.suggest_threshold),
            ("scoring.linked_brand_threshold", s.linked_brand_threshold),
            ("scoring.candidate_floor", s.candidate_floor),
            ("scoring.pairing_threshold", s.pairing_threshold),
            (
                "verifier.brand_match_threshold",
                self.verifier.brand_match_threshold,
            ),
        ] {
            if value > 100 {
                return Err(invalid(name, format!("{} 超出 0-100", value)));
            }
        }

        if s.suggest_threshold > s.auto_select_threshold {
            return Err(invalid(
                "scoring.suggest_threshold",
                format!(
                    "建议阈值 {} 高于自动选中阈值 {}",
                    s.suggest_threshold, s.auto_select_threshold
                ),
            ));
        }

        if !(s.brand_weight > 0.0 && s.brand_weight <= 1.0) {
            return Err(invalid(
                "scoring.brand_weight",
                format!("{} 不在 (0, 1]", s.brand_weight),
            ));
        }

        if s.suggestion_limit == 0 {
            return Err(invalid("scoring.suggestion_limit", "必须大于 0".to_string()));
        }

        if self.validation.numeric_tolerance < 0.0 {
            return Err(invalid(
                "validation.numeric_tolerance",
                format!("{} 为负数", self.validation.numeric_tolerance),
            ));
        }

        Ok(())
    }
}

fn invalid(name: &str, message: String) -> EngineError {
    EngineError::InvalidThreshold {
        name: name.to_string(),
        message,
    }
}
