// ==========================================
// 促销日历对账系统 - 引擎编排器
// ==========================================
// 用途: 协调各引擎的执行顺序
//   多日合并 → 匹配打分 → 冲突拆分 → 审计 (→ 拆分核验)
// 红线: 编排器不做业务判断, 只串联引擎并汇总结果
// ==========================================

use crate::config::ConfigSnapshot;
use crate::domain::deal::{ExternalSnapshot, SpecRecord, TargetMonth};
use crate::engine::audit::{Auditor, MauditReport, SheetConflictReport};
use crate::engine::conflict_planner::{ConflictPlanner, PlanReport};
use crate::engine::error::EngineResult;
use crate::engine::gap_verifier::{FinalCoverageReport, GapClosureReport, GapVerifier};
use crate::engine::match_scorer::{MatchOutcome, MatchScorer};
use crate::engine::multi_day::merge_multi_day;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

// ==========================================
// ReconcileResult - 对账结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub target: TargetMonth,

    // 多日合并后的记录数
    pub merged_records: usize,

    // Match Scorer 输出
    pub matches: Vec<MatchOutcome>,

    // Conflict Planner 输出
    pub plan: PlanReport,

    // Audit 输出
    pub maudit: MauditReport,
    pub sheet_conflicts: SheetConflictReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub gaps: GapClosureReport,
    pub coverage: FinalCoverageReport,
}

// ==========================================
// ReconcileOrchestrator - 引擎编排器
// ==========================================
pub struct ReconcileOrchestrator {
    config: Arc<ConfigSnapshot>,
}

impl ReconcileOrchestrator {
    /// # 参数
    /// - config: 配置快照（阈值 + 覆写表）, 整个流程内不变
    pub fn new(config: Arc<ConfigSnapshot>) -> Self {
        Self { config }
    }

    /// 执行完整对账流程（单个目标月份）
    ///
    /// # 参数
    /// - records: 三个分区的计划表记录
    /// - snapshot: 外部系统快照
    /// - target: 目标月份
    ///
    /// # 返回
    /// - Ok(ReconcileResult)
    /// - Err: 记录违反调用契约（缺品牌等）
    pub fn run(
        &self,
        records: Vec<SpecRecord>,
        snapshot: &ExternalSnapshot,
        target: TargetMonth,
    ) -> EngineResult<ReconcileResult> {
        let settings = &self.config.reconcile;
        let tables = &self.config.overrides;

        info!(
            records = records.len(),
            externals = snapshot.len(),
            month = target.month,
            year = target.year,
            "开始执行对账流程"
        );

        // ==========================================
        // 步骤1: 多日合并
        // ==========================================
        debug!("步骤1: 多日合并");
        let merged = merge_multi_day(records);

        // ==========================================
        // 步骤2: Match Scorer - 匹配打分
        // ==========================================
        debug!("步骤2: 匹配打分");
        let matches = MatchScorer::new(&settings.scoring, tables)
            .with_target(target)
            .match_all(&merged, snapshot)?;

        // ==========================================
        // 步骤3: Conflict Planner - 冲突拆分
        // ==========================================
        debug!("步骤3: 冲突拆分");
        let plan = ConflictPlanner::new(tables).build_plans(&merged, target)?;

        // ==========================================
        // 步骤4: 审计
        // ==========================================
        debug!("步骤4: 审计");
        let auditor = Auditor::new(&settings.validation, tables);
        let maudit = auditor.run_maudit(&merged, snapshot);
        let sheet_conflicts = auditor.find_sheet_conflicts(&merged, target);

        info!(
            matches = matches.len(),
            splits = plan.splits_required.len(),
            mismatches = maudit.mismatches.len(),
            date_conflicts = sheet_conflicts.date_conflicts.len(),
            "对账流程完成"
        );

        Ok(ReconcileResult {
            target,
            merged_records: merged.len(),
            matches,
            plan,
            maudit,
            sheet_conflicts,
        })
    }

    /// 外部系统录入拆分后, 用新快照核验
    pub fn verify(&self, plan: &PlanReport, fresh: &ExternalSnapshot) -> VerificationResult {
        let verifier = GapVerifier::new(&self.config.reconcile.verifier, &self.config.overrides);
        VerificationResult {
            gaps: verifier.verify_gap_closure(plan, fresh),
            coverage: verifier.verify_final_coverage(plan, fresh),
        }
    }
}
