// ==========================================
// 促销日历对账系统 - 外部系统导出映射
// ==========================================
// 职责: 外部系统导出表 → ExternalSnapshot
// 红线: 缺少 ID 列直接报错; 单行 ID 非法只告警跳过
// ==========================================

use crate::domain::deal::{ExternalRecord, ExternalSnapshot};
use crate::engine::date_expander::DateExpander;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::ParsedTable;
use crate::importer::row::{ColumnResolver, RawRow};
use tracing::{info, warn};

/// ID 列候选（按顺序）
const ID_CANDIDATES: &[&str] = &["ID", "id", "MIS ID", "Mis Id", "MIS_ID", "mis_id"];

pub struct ExternalRowMapper {
    columns: ColumnResolver,
}

impl ExternalRowMapper {
    pub fn new() -> Self {
        Self {
            columns: ColumnResolver::new(),
        }
    }

    /// 映射整张导出表
    pub fn map_table(&self, table: &ParsedTable) -> ImportResult<ExternalSnapshot> {
        let id_column = detect_id_column(&table.headers)?;

        let mut records = Vec::with_capacity(table.rows.len());
        let mut skipped = 0usize;
        for row in &table.rows {
            match self.map_row(row, id_column) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        info!(records = records.len(), skipped, id_column, "外部系统快照加载完成");
        Ok(ExternalSnapshot::new(records))
    }

    fn map_row(&self, row: &RawRow, id_column: &str) -> Option<ExternalRecord> {
        let raw_id = row.get(id_column).unwrap_or("").trim();
        let digits = raw_id.strip_suffix(".0").unwrap_or(raw_id);
        let id = match digits.parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                warn!(row = row.row_number(), raw_id, "外部记录 ID 非法, 跳过");
                return None;
            }
        };

        let get = |names: &[&str]| self.columns.get(row, names);
        let mut record = ExternalRecord::new(id, get(&["Brand"]));
        record.linked_brand = get(&["Linked Brand"]);
        record.weekday = get(&["Weekday"]);
        record.discount = get(&["Daily Deal Discount", "Discount"]);
        record.vendor_contribution = get(&["Discount paid by vendor", "Vendor %"]);
        record.locations = get(&["Store", "Locations"]);
        record.categories = get(&["Category", "Categories"]);
        record.rebate_type = get(&["Rebate type", "Rebate Type"]);
        record.start_date = DateExpander::parse_date(&get(&["Start date", "Start Date"]));
        record.end_date = DateExpander::parse_date(&get(&["End date", "End Date"]));
        Some(record)
    }
}

impl Default for ExternalRowMapper {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_id_column(headers: &[String]) -> ImportResult<&'static str> {
    ID_CANDIDATES
        .iter()
        .copied()
        .find(|candidate| headers.iter().any(|h| h == candidate))
        .ok_or_else(|| ImportError::MissingIdColumn {
            candidates: ID_CANDIDATES.join(", "),
        })
}
