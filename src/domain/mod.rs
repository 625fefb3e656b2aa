// ==========================================
// 促销日历对账系统 - 领域模型层
// ==========================================
// 职责: 定义促销记录、门店集合、拆分方案、校验结果等领域类型
// 红线: 不含解析逻辑,不含引擎逻辑
// ==========================================

pub mod deal;
pub mod location;
pub mod plan;
pub mod tagged_id;
pub mod types;
pub mod validation;

// 重导出核心类型
pub use deal::{ExternalRecord, ExternalSnapshot, RowOrigin, SpecRecord, TargetMonth};
pub use location::{Location, LocationSet};
pub use plan::{ConflictPlan, ConflictPlanStep, DateRange, PlanAction};
pub use tagged_id::{Slot, SlotTag, TaggedId, TaggedIdCell};
pub use types::{
    ConflictKind, DealTier, FieldStatus, FrequencyClass, MatchStatus, Severity, Verdict,
};
pub use validation::{
    FieldResult, FieldValue, ValidationField, ValidationRecord, ValidationSummary,
};
