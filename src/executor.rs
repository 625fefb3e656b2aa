// ==========================================
// 促销日历对账系统 - 拆分方案执行器
// ==========================================
// 职责: 人工批准后按顺序把拆分步骤交给外部协作方执行
// 红线: 未批准的方案不执行; 遇到第一个失败立即停止
// 红线: 执行器自身不做任何 I/O, 副作用全部经由 StepApplier
// ==========================================

use crate::config::ExecutorConfig;
use crate::domain::plan::{DateRange, PlanAction};
use crate::engine::conflict_planner::SplitRequirement;
use crate::engine::gap_verifier::{build_entry_payload, EntryPayload};
use crate::engine::tagged_id::TaggedIdCodec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

// ==========================================
// ApplyError - 执行错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("方案未批准: {0}")]
    NotApproved(String),

    #[error("步骤被拒绝 ({action}): {reason}")]
    StepRejected { action: PlanAction, reason: String },

    #[error("外部系统执行失败: {0}")]
    ExternalFailure(String),

    #[error("步骤执行超时 ({action}): {secs}秒")]
    Timeout { action: PlanAction, secs: u64 },

    #[error("新建步骤未返回 ID ({action})")]
    MissingAssignedId { action: PlanAction },
}

/// 人工审批状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Approval {
    Pending,
    Approved { reviewer: String },
    Rejected { reason: String },
}

/// 协作方执行单步后的回执
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedStep {
    pub assigned_id: Option<String>, // CREATE_* 步骤由外部系统分配
}

/// 执行单个拆分步骤的协作方（外部系统录入）
#[async_trait]
pub trait StepApplier: Send + Sync {
    async fn apply(&self, payload: &EntryPayload) -> Result<AppliedStep, ApplyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Applied,
    Skipped, // GAP 无需录入
    Failed,
    NotRun, // 前序步骤失败
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub action: PlanAction,
    pub range: DateRange,
    pub status: StepStatus,
    pub entry_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub brand: String,
    pub source_row: usize,
    pub outcomes: Vec<StepOutcome>,
    pub id_cell: String, // 更新后的标签化 ID 单元格
}

impl ExecutionReport {
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.status, StepStatus::Applied | StepStatus::Skipped))
    }
}

// ==========================================
// PlanExecutor - 方案执行器
// ==========================================
pub struct PlanExecutor {
    step_timeout: Duration,
}

impl PlanExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            step_timeout: Duration::from_secs(config.step_timeout_secs),
        }
    }

    /// 执行一条拆分需求的全部步骤
    ///
    /// # 规则
    /// - 只执行已批准的方案, 否则返回 NotApproved
    /// - GAP 步骤跳过; CREATE_* 必须拿到新 ID; PATCH 复用原 ID
    /// - 任一步骤失败后, 其后步骤标记为 NOT_RUN
    ///
    /// # 返回
    /// 各步骤结果与写回后的 ID 单元格
    #[instrument(skip(self, requirement, approval, applier), fields(brand = %requirement.subordinate.brand))]
    pub async fn execute(
        &self,
        requirement: &SplitRequirement,
        approval: &Approval,
        applier: &dyn StepApplier,
    ) -> Result<ExecutionReport, ApplyError> {
        match approval {
            Approval::Approved { reviewer } => {
                info!(reviewer = %reviewer, steps = requirement.plan.steps().len(), "开始执行拆分方案");
            }
            Approval::Pending => return Err(ApplyError::NotApproved("待审批".to_string())),
            Approval::Rejected { reason } => return Err(ApplyError::NotApproved(reason.clone())),
        }

        let mut id_cell = requirement.subordinate.external_id_cell.clone();
        let mut outcomes = Vec::with_capacity(requirement.plan.steps().len());
        let mut failed = false;

        for step in requirement.plan.steps() {
            let payload = build_entry_payload(requirement, step);
            let mut outcome = StepOutcome {
                action: payload.action,
                range: step.range(),
                status: StepStatus::NotRun,
                entry_id: None,
                error: None,
            };

            if failed {
                outcomes.push(outcome);
                continue;
            }
            if payload.action == PlanAction::Gap {
                outcome.status = StepStatus::Skipped;
                outcomes.push(outcome);
                continue;
            }

            match self.apply_step(&payload, applier).await {
                Ok(entry_id) => {
                    id_cell = TaggedIdCodec::update_cell(
                        &id_cell,
                        &payload.id_slot.to_string(),
                        &entry_id,
                        false,
                    );
                    outcome.status = StepStatus::Applied;
                    outcome.entry_id = Some(entry_id);
                }
                Err(e) => {
                    warn!(action = %payload.action, error = %e, "步骤执行失败, 停止后续步骤");
                    outcome.status = StepStatus::Failed;
                    outcome.error = Some(e.to_string());
                    failed = true;
                }
            }
            outcomes.push(outcome);
        }

        let report = ExecutionReport {
            brand: requirement.subordinate.brand.clone(),
            source_row: requirement.subordinate.origin.first_row(),
            outcomes,
            id_cell,
        };
        info!(complete = report.is_complete(), id_cell = %report.id_cell, "拆分方案执行结束");
        Ok(report)
    }

    /// 单步执行（带超时）, 返回写回的 ID
    async fn apply_step(
        &self,
        payload: &EntryPayload,
        applier: &dyn StepApplier,
    ) -> Result<String, ApplyError> {
        let applied = tokio::time::timeout(self.step_timeout, applier.apply(payload))
            .await
            .map_err(|_| ApplyError::Timeout {
                action: payload.action,
                secs: self.step_timeout.as_secs(),
            })??;

        let entry_id = if payload.action.requires_new_id() {
            applied.assigned_id
        } else {
            payload.existing_id.clone().or(applied.assigned_id)
        };
        entry_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ApplyError::MissingAssignedId {
                action: payload.action,
            })
    }
}
