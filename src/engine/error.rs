// ==========================================
// 促销日历对账系统 - 引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 只有配置/契约错误才抛出; 业务数据不合规一律降级处理
// ==========================================

use thiserror::Error;

/// 引擎层错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 配置错误 =====
    #[error("未知的频次分类: {0}")]
    UnknownFrequencyClass(String),

    #[error("阈值配置非法 ({name}): {message}")]
    InvalidThreshold { name: String, message: String },

    #[error("目标月份非法: {year}-{month}")]
    InvalidTargetMonth { year: i32, month: u32 },

    // ===== 契约错误 =====
    #[error("记录缺少身份字段 (行 {row}, 字段 {field})")]
    MissingIdentityField { row: usize, field: String },
}

/// 引擎层 Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::MissingIdentityField {
            row: 12,
            field: "brand".to_string(),
        };
        assert_eq!(err.to_string(), "记录缺少身份字段 (行 12, 字段 brand)");

        let err = EngineError::UnknownFrequencyClass("quarterly".to_string());
        assert!(err.to_string().contains("quarterly"));
    }
}
