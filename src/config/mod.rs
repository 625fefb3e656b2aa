// ==========================================
// 促销日历对账系统 - 配置层
// ==========================================
// 职责: 对账阈值、人工覆写表、配置文件加载
// 存储: JSON 配置文件
// ==========================================

pub mod config_manager;
pub mod error;
pub mod override_tables;
pub mod reconcile_config;

// 重导出核心配置
pub use config_manager::{ConfigManager, ConfigSnapshot};
pub use error::{ConfigError, ConfigResult};
pub use override_tables::OverrideTables;
pub use reconcile_config::{
    ExecutorConfig, ReconcileConfig, ScoringConfig, ValidationConfig, VerifierConfig,
};
