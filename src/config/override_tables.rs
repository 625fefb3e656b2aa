// ==========================================
// 促销日历对账系统 - 人工维护覆写表
// ==========================================
// 职责: 品牌覆写、门店同义词、列名别名
// 红线: 覆写表是纯数据, 由调用方注入, 引擎不内置业务品牌
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideTables {
    /// 计划表品牌 → 外部系统品牌
    pub brand_overrides: HashMap<String, String>,

    /// 门店原始写法 → 标准门店名（补充内置同义词）
    pub location_synonyms: HashMap<String, String>,

    /// 列名别名: 逻辑列名 → 备选表头（追加在内置别名之后）
    pub column_aliases: HashMap<String, Vec<String>>,
}

impl OverrideTables {
    /// 品牌覆写查找
    ///
    /// # 规则
    /// - 先精确匹配, 再大小写不敏感匹配
    pub fn brand_override(&self, brand: &str) -> Option<&str> {
        let key = brand.trim();
        if let Some(target) = self.brand_overrides.get(key) {
            return Some(target.as_str());
        }
        self.brand_overrides
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// 门店同义词查找（大小写不敏感）
    pub fn location_synonym(&self, raw: &str) -> Option<&str> {
        let key = raw.trim();
        self.location_synonyms
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// 指定逻辑列的额外别名
    pub fn extra_aliases(&self, column: &str) -> &[String] {
        self.column_aliases
            .get(column)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_override_case_insensitive() {
        let mut tables = OverrideTables::default();
        tables
            .brand_overrides
            .insert("Kiva".to_string(), "Kiva Confections".to_string());
        assert_eq!(tables.brand_override("Kiva"), Some("Kiva Confections"));
        assert_eq!(tables.brand_override("KIVA "), Some("Kiva Confections"));
        assert_eq!(tables.brand_override("Wyld"), None);
    }

    #[test]
    fn test_extra_aliases_default_empty() {
        let tables = OverrideTables::default();
        assert!(tables.extra_aliases("brand").is_empty());
    }
}
