// ==========================================
// 促销日历对账系统 - 核心库
// ==========================================
// 职责: 计划表与外部系统促销记录的匹配、冲突拆分、核验与审计
// 系统定位: 决策支持系统 (人工批准后才执行拆分)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 阈值与覆写表
pub mod config;

// 执行层 - 批准后的步骤执行
pub mod executor;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConflictKind, DealTier, FrequencyClass, MatchStatus, Severity, Verdict};

// 领域实体
pub use domain::{
    ConflictPlan, ExternalRecord, ExternalSnapshot, LocationSet, SpecRecord, TargetMonth,
};

// 引擎
pub use engine::{
    Auditor, ConflictPlanner, FieldValidationEngine, GapVerifier, LocationResolver, MatchScorer,
    ReconcileOrchestrator,
};

// 执行
pub use executor::{ApplyError, Approval, PlanExecutor, StepApplier};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "促销日历对账系统";
