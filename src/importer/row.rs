// ==========================================
// 促销日历对账系统 - 原始行与列名解析
// ==========================================
// 职责: 保持表头顺序的字符串行; 按有序策略把逻辑列名解析到实际表头
// 策略顺序（对每个候选名）:
//   1. 方括号别名: "[Weekday]" → "Weekday [Weekday]"
//   2. 精确表头
//   3. 旧名前缀: "Weekday" → "Weekday [Weekday]"
//   4. 覆写表中的附加别名
// ==========================================

use crate::config::OverrideTables;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static BRACKET_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*(\[[^\]]+\])\s*$").expect("valid bracket header regex"));

// ==========================================
// RawRow - 原始行
// ==========================================
/// 一行数据, 单元格按表头顺序保存
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    row_number: usize, // 表格中的行号（表头为第 1 行）
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(row_number: usize, cells: Vec<(String, String)>) -> Self {
        Self { row_number, cells }
    }

    /// 便于测试与手工构造
    pub fn from_pairs(row_number: usize, pairs: &[(&str, &str)]) -> Self {
        Self::new(
            row_number,
            pairs
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn row_number(&self) -> usize {
        self.row_number
    }

    /// 表头对应的值（重复表头取第一个）
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, v)| v.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

// ==========================================
// ColumnResolver - 列名解析
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnResolver {
    bracket_map: HashMap<String, String>, // "[Weekday]" → "Weekday [Weekday]"
    prefix_map: HashMap<String, String>,  // "Weekday" → "Weekday [Weekday]"
    extra_aliases: HashMap<String, Vec<String>>,
}

impl ColumnResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由表头列表推导方括号别名和旧名前缀
    ///
    /// 同一方括号标签出现多次时保留第一个
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut resolver = Self::default();
        for header in headers {
            let header = header.as_ref();
            let Some(caps) = BRACKET_HEADER_RE.captures(header.trim()) else {
                continue;
            };
            let tag = caps[2].to_string();
            let prefix = caps[1].trim().to_string();

            resolver
                .bracket_map
                .entry(tag)
                .or_insert_with(|| header.to_string());
            if !prefix.is_empty() {
                resolver
                    .prefix_map
                    .entry(prefix)
                    .or_insert_with(|| header.to_string());
            }
        }
        resolver
    }

    /// 附加覆写表中的列别名
    pub fn with_overrides(mut self, tables: &OverrideTables) -> Self {
        self.extra_aliases = tables.column_aliases.clone();
        self
    }

    /// 方括号标签对应的实际表头
    pub fn bracket_header(&self, tag: &str) -> Option<&str> {
        self.bracket_map.get(tag).map(|s| s.as_str())
    }

    /// 全部带指定方括号标签的表头（大小写不敏感）
    pub fn headers_with_tag<'r>(&self, row: &'r RawRow, tag: &str) -> Vec<&'r str> {
        let needle = tag.to_lowercase();
        row.headers()
            .filter(|h| h.to_lowercase().contains(&needle))
            .collect()
    }

    /// 按候选名顺序解析, 返回第一个存在的列的值
    pub fn lookup<'r>(&self, row: &'r RawRow, names: &[&str]) -> Option<&'r str> {
        for name in names {
            if let Some(value) = self.lookup_one(row, name) {
                return Some(value);
            }
        }
        None
    }

    /// 同 lookup, 找不到时返回空串并去掉首尾空白
    pub fn get(&self, row: &RawRow, names: &[&str]) -> String {
        self.lookup(row, names)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    fn lookup_one<'r>(&self, row: &'r RawRow, name: &str) -> Option<&'r str> {
        if let Some(value) = self.bracket_map.get(name).and_then(|h| row.get(h)) {
            return Some(value);
        }
        if let Some(value) = row.get(name) {
            return Some(value);
        }
        if let Some(value) = self.prefix_map.get(name).and_then(|h| row.get(h)) {
            return Some(value);
        }
        self.extra_aliases
            .get(name)
            .and_then(|aliases| aliases.iter().find_map(|alias| row.get(alias)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_headers_derives_maps() {
        let resolver = ColumnResolver::from_headers(&["Brand [Brand]", "Weekday [Weekday]", "Notes"]);
        assert_eq!(resolver.bracket_header("[Weekday]"), Some("Weekday [Weekday]"));
        assert_eq!(resolver.prefix_map.get("Brand").map(|s| s.as_str()), Some("Brand [Brand]"));
        assert!(resolver.bracket_header("[Notes]").is_none());
    }

    #[test]
    fn test_lookup_strategy_order() {
        let row = RawRow::from_pairs(
            2,
            &[("Weekday [Weekday]", "Monday"), ("Day of Week", "Friday"), ("Brand", "Kiva")],
        );
        let resolver = ColumnResolver::from_headers(&["Weekday [Weekday]", "Day of Week", "Brand"]);

        assert_eq!(resolver.get(&row, &["[Weekday]", "Day of Week"]), "Monday");
        // 旧名前缀
        assert_eq!(resolver.get(&row, &["Weekday"]), "Monday");
        assert_eq!(resolver.get(&row, &["[Brand]", "Brand"]), "Kiva");
        assert_eq!(resolver.get(&row, &["Missing"]), "");
    }

    #[test]
    fn test_override_aliases() {
        let mut tables = OverrideTables::default();
        tables
            .column_aliases
            .insert("Brand".to_string(), vec!["Vendor Name".to_string()]);
        let row = RawRow::from_pairs(3, &[("Vendor Name", "Wyld")]);
        let resolver = ColumnResolver::new().with_overrides(&tables);
        assert_eq!(resolver.get(&row, &["Brand"]), "Wyld");
    }

    #[test]
    fn test_raw_row_first_duplicate_wins() {
        let row = RawRow::from_pairs(4, &[("A", "1"), ("A", "2"), ("B", " ")]);
        assert_eq!(row.get("A"), Some("1"));
        assert!(!row.is_blank());
        assert!(RawRow::from_pairs(5, &[("A", ""), ("B", "  ")]).is_blank());
    }
}
