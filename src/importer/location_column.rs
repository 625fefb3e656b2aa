// ==========================================
// 促销日历对账系统 - 门店列路由
// ==========================================
// 职责: 从计划表行中找出"促销适用门店"的原文
// 规则:
//   1. [Store] 方括号别名
//   2. 表头含 "(discount applies at)"
//   3. 表头同时含 "discount" 和 "applies"
//   4. 以 "locations" 开头且不是 marketing 的表头
//   "Same as Marketing" → 改读 marketing 门店列; 循环引用 → 空文本（解析为全部门店）
// ==========================================

use crate::importer::row::{ColumnResolver, RawRow};
use tracing::warn;

const SAME_AS_MARKETING: &str = "same as market";

/// 门店列原文
pub fn resolve_location_text(row: &RawRow, columns: &ColumnResolver) -> String {
    let Some(header) = find_location_header(row, columns) else {
        return String::new();
    };
    let value = row.get(header).unwrap_or("").trim();

    if !value.to_lowercase().contains(SAME_AS_MARKETING) {
        return clean(value);
    }

    let Some(marketing) = find_marketing_header(row) else {
        warn!(row = row.row_number(), "'Same as Marketing' 但找不到 Marketing 门店列");
        return String::new();
    };
    let marketing_value = row.get(marketing).unwrap_or("").trim();
    if marketing_value.to_lowercase().contains(SAME_AS_MARKETING) {
        warn!(row = row.row_number(), "门店列与 Marketing 列循环引用 'Same as Marketing'");
        return String::new();
    }
    clean(marketing_value)
}

fn find_location_header<'r>(row: &'r RawRow, columns: &ColumnResolver) -> Option<&'r str> {
    if let Some(bracket) = columns.bracket_header("[Store]") {
        if let Some(header) = row.headers().find(|h| *h == bracket) {
            return Some(header);
        }
    }

    let mut secondary = None;
    let mut fallback = None;
    for header in row.headers() {
        let lower = header.to_lowercase().replace('\n', " ");
        if lower.contains("(discount applies at)") {
            return Some(header);
        }
        if secondary.is_none() && lower.contains("discount") && lower.contains("applies") {
            secondary = Some(header);
        }
        if fallback.is_none()
            && !lower.contains("marketing")
            && lower
                .split_whitespace()
                .next()
                .is_some_and(|first| first.starts_with("locations"))
        {
            fallback = Some(header);
        }
    }
    secondary.or(fallback)
}

fn find_marketing_header(row: &RawRow) -> Option<&str> {
    row.headers().find(|h| {
        let lower = h.to_lowercase();
        lower.contains("marketing") && lower.contains("location")
    })
}

fn clean(value: &str) -> String {
    match value.to_lowercase().as_str() {
        "nan" | "none" => String::new(),
        _ => value.to_string(),
    }
}
