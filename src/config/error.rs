// ==========================================
// 促销日历对账系统 - 配置错误类型
// ==========================================

use crate::engine::error::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    // ===== 文件相关错误 =====
    #[error("配置文件不存在: {0}")]
    FileNotFound(String),

    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件格式错误: {0}")]
    Parse(#[from] serde_json::Error),

    // ===== 内容错误 =====
    #[error("配置校验失败: {0}")]
    Invalid(#[from] EngineError),

    #[error("无法定位系统配置目录")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
