// ==========================================
// 促销日历对账系统 - 导入层
// ==========================================
// 职责: 计划表三个分区与外部系统导出 → 内存记录
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod external_mapper;
pub mod file_parser;
pub mod location_column;
pub mod plan_importer;
pub mod row;
pub mod spec_mapper;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use external_mapper::ExternalRowMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, ParsedTable, UniversalFileParser};
pub use location_column::resolve_location_text;
pub use plan_importer::{PlanImport, PlanImporter};
pub use row::{ColumnResolver, RawRow};
pub use spec_mapper::{format_categories, MappedSection, SkippedRow, SpecRowMapper};
