// ==========================================
// 促销日历对账系统 - 引擎层
// ==========================================
// 职责: 门店解析、日期展开、标签化 ID、匹配打分、冲突拆分、核验、字段校验、审计
// 红线: 引擎只做纯计算, 输入不可变, 不做 I/O
// 红线: 业务数据异常走兜底规则, 只有违反调用契约才返回 Err
// ==========================================

pub mod audit;
pub mod brand;
pub mod conflict_planner;
pub mod date_expander;
pub mod error;
pub mod gap_verifier;
pub mod location_resolver;
pub mod match_scorer;
pub mod multi_day;
pub mod orchestrator;
pub mod similarity;
pub mod tagged_id;
pub mod validation;

// 重导出核心引擎
pub use audit::{Auditor, MauditReport, SheetConflictReport, ZombieGroup};
pub use brand::{pair_ids_to_brands, parse_multi_brand, resolve_brand_for_match, BrandIdPairing};
pub use conflict_planner::{ConflictPlanner, PlanReport, SplitRequirement};
pub use date_expander::DateExpander;
pub use error::{EngineError, EngineResult};
pub use gap_verifier::{
    build_entry_payload, EntryPayload, FinalCoverageReport, FinalEntryCheck, GapClosureReport,
    GapVerifier,
};
pub use location_resolver::{classify_conflict, LocationConflict, LocationResolver};
pub use match_scorer::{MatchCandidate, MatchOutcome, MatchScorer, Resolution};
pub use multi_day::{group_multi_day, merge_multi_day, MultiDayGrouping};
pub use orchestrator::{ReconcileOrchestrator, ReconcileResult, VerificationResult};
pub use tagged_id::TaggedIdCodec;
pub use validation::FieldValidationEngine;
